use serde::{Deserialize, Serialize};

use crate::cards::repo::{CardPatch, NewCard};

/// Upsert body. `qr_code` is deliberately absent: the artifact is derived
/// server-side after every write.
#[derive(Debug, Deserialize)]
pub struct UpsertCardRequest {
    pub name: String,
    pub title: String,
    pub company: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub address: String,
}

impl UpsertCardRequest {
    pub fn into_new(self) -> NewCard {
        NewCard {
            name: self.name,
            title: self.title,
            company: self.company,
            email: self.email,
            phone: self.phone,
            website: self.website,
            address: self.address,
        }
    }

    pub fn into_patch(self) -> CardPatch {
        CardPatch {
            name: Some(self.name),
            title: Some(self.title),
            company: Some(self.company),
            email: Some(self.email),
            phone: Some(self.phone),
            website: Some(self.website),
            address: Some(self.address),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct QrCodeResponse {
    #[serde(rename = "qrCode")]
    pub qr_code: String,
}
