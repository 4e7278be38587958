#[tokio::main]
async fn main() {
    encode_pipeline::app::main_for(encode_pipeline::presets::segmented_default_manifest).await;
}
