//! SiliconFlow text-to-image provider.

mod client;
mod dto;

pub use client::SiliconFlowClient;
pub use dto::{
    BUSY_CODE, MAX_SEED, SILICONFLOW_ENDPOINT, SiliconFlowConfig, SiliconFlowImage,
    SiliconFlowRequest, SiliconFlowResponse,
};
