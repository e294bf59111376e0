pub mod auth;
pub mod cart;
pub mod catalog;
pub mod error;
pub mod evaluation;
pub mod executable_utils;
pub mod gateway;
pub mod inference;
pub mod model;
pub mod payment;
pub mod storage;
pub mod webhook;
