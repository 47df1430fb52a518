//! Binary entry point for the cookie bakery demo.

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    lib_bakery::init().await
}
