pub mod client;

pub use client::{interval_secs, BinanceClient, Ticker24h, MAX_KLINES};
