use anyhow::{Context, Result};
use attachkit_media::Toolkit;
use tracing::info;

/// Verify the host surfaces the toolkit depends on.
pub async fn run_all(kit: &Toolkit) -> Result<()> {
    check_decoder(kit).await?;
    info!("all preflight checks passed");
    Ok(())
}

async fn check_decoder(kit: &Toolkit) -> Result<()> {
    let decoder = kit.decoder();
    decoder.check_available().await.with_context(|| {
        format!(
            "video decoder '{}' is not available. Install ffmpeg or set ATTACHKIT_FFMPEG",
            decoder.name()
        )
    })?;
    info!("decoder: {} ok", decoder.name());
    Ok(())
}
