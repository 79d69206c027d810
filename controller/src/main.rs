#[cfg(feature = "esp32")]
mod esp;
#[cfg(not(feature = "esp32"))]
mod host;
#[cfg(any(feature = "esp32", test))]
#[cfg_attr(not(feature = "esp32"), allow(dead_code))]
mod oled;

#[cfg(not(feature = "esp32"))]
fn main() -> anyhow::Result<()> {
    host::run()
}

#[cfg(feature = "esp32")]
fn main() -> anyhow::Result<()> {
    esp::run()
}
