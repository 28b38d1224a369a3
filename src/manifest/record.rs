use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Serialize};

/// One encoded frame with the per-video metadata it was captured under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRecord {
    /// Base64 of the raw image file.
    pub image: String,
    #[serde(rename = "screenColor")]
    pub screen_color: String,
    pub wallet: String,
}

impl FrameRecord {
    pub fn encode(image: &[u8], wallet: &str, screen_color: &str) -> Self {
        Self {
            image: BASE64.encode(image),
            screen_color: screen_color.to_string(),
            wallet: wallet.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_manifest_keys() {
        let record = FrameRecord::encode(&[0xff, 0xd8, 0xff], "0xwallet", "RED");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "image": "/9j/",
                "screenColor": "RED",
                "wallet": "0xwallet",
            })
        );
    }
}
