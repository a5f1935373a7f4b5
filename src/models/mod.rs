// Pretrained model files fetched at runtime.

pub mod download;
