pub mod config;
pub mod error;
pub mod state;
pub mod db;
pub mod router;

pub mod crypto {
    pub mod token;
}

pub mod models {
    pub mod user;
    pub mod session;
}

pub mod repositories {
    pub mod user;
    pub mod session;
}

pub mod services {
    pub mod auth;
    pub mod session;
}

pub mod handlers {
    pub mod users;
}

pub mod middleware_layer {
    pub mod auth;
    pub mod client;
    pub mod json;
}

pub mod validation {
    pub mod auth;
}
