use schemagate::client;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let mut stdout = std::io::stdout().lock();
    let code = client::run(std::env::args_os(), &mut stdout).await;
    std::process::exit(code);
}
