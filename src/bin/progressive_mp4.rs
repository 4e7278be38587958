#[tokio::main]
async fn main() {
    encode_pipeline::app::main_for(encode_pipeline::presets::progressive_mp4).await;
}
