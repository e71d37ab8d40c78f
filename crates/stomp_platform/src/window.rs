use std::sync::Arc;
use winit::dpi::LogicalSize;
use winit::event_loop::ActiveEventLoop;
use winit::window::{Window, WindowAttributes};

/// Window settings. The size is the game's logical resolution; the window is
/// not resizable so world units map 1:1 to logical pixels.
pub struct PlatformConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            title: "Slime Stomp".to_string(),
            width: 800,
            height: 600,
        }
    }
}

pub fn create_window(
    event_loop: &ActiveEventLoop,
    config: &PlatformConfig,
) -> Result<Arc<Window>, String> {
    let attrs = WindowAttributes::default()
        .with_title(&config.title)
        .with_resizable(false)
        .with_inner_size(LogicalSize::new(config.width, config.height));

    let window = event_loop
        .create_window(attrs)
        .map_err(|e| format!("Failed to create window: {e}"))?;
    log::info!(
        "Window created: '{}' {}x{}",
        config.title,
        config.width,
        config.height
    );
    Ok(Arc::new(window))
}
