//! # Command-Line Interface Module
//!
//! Argument parsing for the demo binary: enough configuration to stand up a
//! loopback client/server pair and issue a handful of calls against it, for
//! manual exercising of [`crate::client`] outside the test suite.

use clap::{
    builder::styling::{AnsiColor, Styles},
    Parser,
};

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Yellow.on_default())
        .usage(AnsiColor::Yellow.on_default())
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// UAVCAN client port demo — exercises `uavcan_client` against an in-memory
/// loopback transport.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None, styles = styles())]
pub struct DemoArgs {
    /// Service-ID of the session specifier used for this run.
    #[arg(long, default_value_t = 1)]
    pub service_id: u16,

    /// Node-ID of the (simulated) remote server.
    #[arg(long, default_value_t = 42)]
    pub server_node_id: u16,

    /// Transfer-ID modulus, i.e. the size of the transport's transfer-ID
    /// value space. Classical CAN restricts this to as few as 32.
    #[arg(long, default_value_t = 32)]
    pub transfer_id_modulo: u64,

    /// Response timeout in milliseconds applied to every call.
    #[arg(long, default_value_t = 1000)]
    pub response_timeout_ms: u64,

    /// Number of requests to issue before exiting.
    #[arg(short = 'n', long, default_value_t = 5)]
    pub requests: usize,

    /// Emit the final statistics snapshot as JSON on stdout.
    #[arg(long)]
    pub json: bool,

    /// Increase diagnostic log verbosity on stderr.
    ///
    /// Can be used multiple times to increase detail:
    ///  -v: debug
    ///  -vv and more: trace
    /// By default, only INFO and above are shown.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Silence user-facing informational output on stdout.
    #[arg(short = 'q', long)]
    pub quiet: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn demo_args_command_is_well_formed() {
        DemoArgs::command().debug_assert();
    }
}
