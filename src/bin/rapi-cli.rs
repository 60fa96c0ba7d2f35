use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use reqwest::Method;
use serde::Serialize;

use rapi::client::{CallError, CallOptions, Factory};
use rapi::demo::{
    ErrorReply, NowReply, NowRequest, PingReply, PingRequest, ReverseReply, ReverseRequest,
};

#[derive(Parser)]
#[command(name = "rapi-cli")]
#[command(about = "Call the rapi demo server", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://127.0.0.1:8080")]
    url: String,

    /// Send the input as a JSON body even for GET.
    #[arg(long)]
    force_body: bool,

    /// Give up after this many milliseconds.
    #[arg(long)]
    timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Echo a payload
    Ping { payload: String },
    /// Reverse a string
    Reverse {
        string: String,
        /// Use POST instead of GET
        #[arg(long)]
        post: bool,
    },
    /// Server time, optionally from a reference time plus drift
    Now {
        #[arg(long)]
        time: Option<DateTime<Utc>>,
        #[arg(long, default_value_t = 0)]
        drift_ms: i64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut options = CallOptions::new()
        .error_output::<ErrorReply>()
        .force_body(cli.force_body);
    if let Some(ms) = cli.timeout_ms {
        options = options.timeout(std::time::Duration::from_millis(ms));
    }
    let factory = Factory::parse(reqwest::Client::new(), &cli.url, options)?;

    match cli.command {
        Commands::Ping { payload } => {
            let caller = factory.caller::<PingReply>("ping", Method::GET, CallOptions::new());
            print_result(caller.call(&PingRequest { payload }).await)
        }
        Commands::Reverse { string, post } => {
            let method = if post { Method::POST } else { Method::GET };
            let caller = factory.caller::<ReverseReply>("reverse", method, CallOptions::new());
            print_result(caller.call(&ReverseRequest { string }).await)
        }
        Commands::Now { time, drift_ms } => {
            let caller = factory.caller::<NowReply>("now", Method::GET, CallOptions::new());
            print_result(caller.call(&NowRequest { time, drift: drift_ms }).await)
        }
    }
}

fn print_result<O: Serialize>(
    result: Result<rapi::client::Response<O>, CallError>,
) -> Result<(), Box<dyn std::error::Error>> {
    match result {
        Ok(response) => {
            if let Some(out) = response.out {
                println!("{}", serde_json::to_string_pretty(&out)?);
            }
            Ok(())
        }
        Err(err) => {
            if let Some(reply) = err.structured::<ErrorReply>() {
                eprintln!("Error: server returned {:?}: {}", err.status(), reply.error);
            } else {
                eprintln!("Error: {err}");
            }
            Err(err.into())
        }
    }
}
