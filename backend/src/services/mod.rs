pub mod coin_service;
pub mod countdown_service;
