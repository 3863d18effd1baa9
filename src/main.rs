#[actix_web::main]
async fn main() -> std::io::Result<()> {
    traffic_insight_lib::run().await
}
