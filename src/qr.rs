use anyhow::Context;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use qrcode::{render::svg, EcLevel, QrCode};

/// Renders the QR artifact stored on a business card: an SVG data URL
/// encoding the public card page for the given record. The artifact is
/// derived state; callers never author it directly.
pub struct QrRenderer {
    frontend_url: String,
}

impl QrRenderer {
    pub fn new(frontend_url: impl Into<String>) -> Self {
        let mut frontend_url = frontend_url.into();
        while frontend_url.ends_with('/') {
            frontend_url.pop();
        }
        Self { frontend_url }
    }

    /// Public page a scanned card resolves to.
    pub fn card_url(&self, card_id: i64) -> String {
        format!("{}/card/{}", self.frontend_url, card_id)
    }

    pub fn render(&self, card_id: i64) -> anyhow::Result<String> {
        let url = self.card_url(card_id);
        let code = QrCode::with_error_correction_level(url.as_bytes(), EcLevel::H)
            .context("encode card url")?;
        let image = code
            .render::<svg::Color>()
            .min_dimensions(300, 300)
            .dark_color(svg::Color("#000000"))
            .light_color(svg::Color("#ffffff"))
            .build();
        Ok(format!(
            "data:image/svg+xml;base64,{}",
            STANDARD.encode(image)
        ))
    }
}
