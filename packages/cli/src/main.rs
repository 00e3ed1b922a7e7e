mod format;

use std::io::{self, Write};

use clap::Parser;

use treefs_http::{Error, TreeClient};

/// fsc - inspect a treefs server
#[derive(Parser, Debug)]
#[command(name = "fsc")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The host to use for the API
    #[arg(long, default_value = "0.0.0.0:6000")]
    host: String,

    /// Use http instead of https
    #[arg(long)]
    insecure: bool,

    /// Print the response body as received
    #[arg(long)]
    raw: bool,

    /// Include file content when listing a directory
    #[arg(long)]
    populate_data: bool,

    /// Path to fetch, relative to the served root
    #[arg(default_value = "")]
    path: String,
}

impl Args {
    fn base_url(&self) -> String {
        let scheme = if self.insecure { "http" } else { "https" };
        format!("{}://{}", scheme, self.host)
    }
}

fn run(args: &Args) -> Result<(), Error> {
    let client = TreeClient::new(&args.base_url())?;
    log::debug!("fetching {:?} from {}", args.path, client.base_url());

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let written = if args.raw {
        let body = client.get_raw(&args.path, args.populate_data)?;
        out.write_all(body.as_bytes())
    } else {
        let item = client.get(&args.path, args.populate_data)?;
        format::print_item(&mut out, &item)
    };

    if let Err(e) = written.and_then(|()| out.flush()) {
        log::warn!("failed to write output: {}", e);
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => {}
        Err(Error::Api { status, body }) => {
            eprintln!("request failed with status {}", status);
            eprintln!("{}: {}", body.id, body.user_message);
            eprintln!("{}", body.system_message);
            std::process::exit(1);
        }
        Err(Error::UnexpectedResponse { status, body }) => {
            eprintln!("request failed with status {}", status);
            eprintln!("{}", body);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
