#[tokio::main]
async fn main() {
    encode_pipeline::app::main_for(encode_pipeline::presets::sprites_and_watermark).await;
}
