// Smart Device Management API
//
// OAuth2 credentials and the device directory used to find a camera and
// relay WebRTC offers to it.

pub mod auth;
pub mod client;
pub mod error;

pub use auth::{ClientSecrets, OAuthTokenProvider, StaticTokenProvider, StoredToken, TokenProvider};
pub use client::{select_camera, Device, DeviceDirectory, DeviceOfferExchanger, SdmClient};
pub use error::{SdmError, SdmResult};
