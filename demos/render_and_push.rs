//! Render a status card locally and push it to a Quote/0
//!
//! Run with: cargo run --example render_and_push --features render
//!
//! Requires:
//!   - DOT_API_KEY set to a Dot. developer key
//!   - DOT_DEFAULT_DEVICE_ID set, or a device bound to the key

use quote0::encode::bitmap_to_base64;
use quote0::{render, Client, DitherType, ImagePush, RenderSpec};

#[tokio::main]
async fn main() -> Result<(), quote0::Error> {
    let Some(client) = Client::from_env() else {
        eprintln!("DOT_API_KEY is not set");
        std::process::exit(1);
    };

    let devices = client.list_devices().await?;
    for device in &devices {
        println!("Found {} ({})", device.id, device.model.as_deref().unwrap_or("?"));
    }

    let spec = RenderSpec::new()
        .with_title("Build status")
        .with_message("main: passing\nrelease: 3 jobs queued\ndocs: deployed")
        .with_signature("ci");
    let image = bitmap_to_base64(&render(&spec))?;

    let mut push = ImagePush::new(image);
    push.dither_type = DitherType::None;
    if client.config().await.default_device_id.is_none() {
        match devices.first() {
            Some(device) => push = push.with_device(&device.id),
            None => {
                eprintln!("No device bound to this key");
                std::process::exit(1);
            }
        }
    }

    let response = client.send_image(&push).await?;
    println!("Pushed: {}", response.message.as_deref().unwrap_or("ok"));

    client.close().await;
    Ok(())
}
