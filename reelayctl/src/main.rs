use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = reelayctl::Cli::parse();
    reelayctl::init_tracing();
    if let Err(err) = reelayctl::run(cli).await {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
