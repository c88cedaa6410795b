//! Serve a directory over HTTP.
//!
//! Run with:
//!   cargo run --example serve -- 127.0.0.1:8080 ./public
//!
//! Try:
//!   curl -i http://127.0.0.1:8080/
//!   curl -i --path-as-is http://127.0.0.1:8080/../etc/passwd   # 403
//!   curl -i http://127.0.0.1:8080/missing.txt                  # 404

use turbine::{DocumentRoot, Resolver, Server};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let addr = args.next().unwrap_or_else(|| "127.0.0.1:8080".to_owned());
    let root = args.next().unwrap_or_else(|| ".".to_owned());

    let resolver = Resolver::new(DocumentRoot::new(&root)?);
    Server::bind(&addr)?.serve(resolver).await?;
    Ok(())
}
