// src/models/settings.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

pub const SHOP_NAME: &str = "shop_name";
pub const SHOP_ADDRESS: &str = "shop_address";
pub const SHOP_PHONE: &str = "shop_phone";
pub const SHOP_GST_NUMBER: &str = "shop_gst_number";
pub const RECEIPT_FOOTER_MESSAGE: &str = "receipt_footer_message";

pub const SHOP_SETTING_KEYS: [&str; 5] = [
    SHOP_NAME,
    SHOP_ADDRESS,
    SHOP_PHONE,
    SHOP_GST_NUMBER,
    RECEIPT_FOOTER_MESSAGE,
];

// Dados da loja impressos no recibo
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ShopSettings {
    #[schema(example = "Mercadinho Central")]
    pub shop_name: String,
    pub shop_address: String,
    pub shop_phone: String,
    pub shop_gst_number: String,
    pub receipt_footer_message: String,
}

impl Default for ShopSettings {
    fn default() -> Self {
        Self {
            shop_name: "My Shop".to_string(),
            shop_address: String::new(),
            shop_phone: String::new(),
            shop_gst_number: String::new(),
            receipt_footer_message: "Thank you for shopping with us!".to_string(),
        }
    }
}

impl ShopSettings {
    /// Monta a partir de pares chave/valor; chaves ausentes ficam com o padrão.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut settings = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                SHOP_NAME => settings.shop_name = value,
                SHOP_ADDRESS => settings.shop_address = value,
                SHOP_PHONE => settings.shop_phone = value,
                SHOP_GST_NUMBER => settings.shop_gst_number = value,
                RECEIPT_FOOTER_MESSAGE => settings.receipt_footer_message = value,
                _ => {}
            }
        }
        settings
    }
}

// Atualização parcial (PUT)
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateShopSettingsPayload {
    #[validate(length(min = 1, max = 200))]
    pub shop_name: Option<String>,
    #[validate(length(max = 500))]
    pub shop_address: Option<String>,
    #[validate(length(max = 30))]
    pub shop_phone: Option<String>,
    #[validate(length(max = 30))]
    pub shop_gst_number: Option<String>,
    #[validate(length(max = 500))]
    pub receipt_footer_message: Option<String>,
}

impl UpdateShopSettingsPayload {
    pub fn into_pairs(self) -> Vec<(&'static str, String)> {
        [
            (SHOP_NAME, self.shop_name),
            (SHOP_ADDRESS, self.shop_address),
            (SHOP_PHONE, self.shop_phone),
            (SHOP_GST_NUMBER, self.shop_gst_number),
            (RECEIPT_FOOTER_MESSAGE, self.receipt_footer_message),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key, v)))
        .collect()
    }
}
