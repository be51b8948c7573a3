use clap::Parser;

/// Send ICMP echo requests to a host and report the round trip time
#[derive(Parser, Debug, Clone)]
#[command(name = "echoping", author, version, about, long_about = None)]
pub struct Args {
    /// Destination address (required)
    #[arg(short = 'a', long = "address")]
    pub address: Option<String>,

    /// Number of echo requests
    #[arg(short = 'n', long = "count", default_value_t = 3, allow_negative_numbers = true)]
    pub count: i64,

    /// ICMP identifier (0-65535) [default: PID & 0xffff]
    #[arg(long = "id", allow_negative_numbers = true)]
    pub identifier: Option<i64>,

    /// Timeout for each ping (e.g. 3s, 200ms)
    #[arg(short = 't', long = "timeout", default_value = "3s")]
    pub timeout: String,

    /// Enable verbose debug logging to stderr
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// The debug log filter [default: echoping=debug]
    #[arg(long = "log-filter", default_value = "echoping=debug")]
    pub log_filter: String,
}
