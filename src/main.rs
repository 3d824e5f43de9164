use vibecaption_bot::{BoxError, run};

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    run().await
}
