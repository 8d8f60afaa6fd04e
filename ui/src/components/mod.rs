pub mod app;
pub mod chat_widget;
pub mod local_store;
pub mod relay_client;
