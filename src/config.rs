use std::env;

pub struct StripeSettings {
    pub secret_key: String,
    pub webhook_secret: String,
    pub price_starter: String,
    pub price_studio: String,
    pub price_agency: String,
}

pub struct Config {
    pub database_url: String,
    pub frontend_origin: String,
    pub stripe: StripeSettings,
    pub auth_cookie_secure: bool,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok(); // Load .env file

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let frontend_origin = env::var("FRONTEND_ORIGIN").expect("FRONTEND_ORIGIN must be set");

        let stripe = StripeSettings {
            secret_key: env::var("STRIPE_SECRET_KEY").expect("STRIPE_SECRET_KEY must be set"),
            webhook_secret: env::var("STRIPE_WEBHOOK_SECRET")
                .expect("STRIPE_WEBHOOK_SECRET must be set"),
            price_starter: env::var("STRIPE_PRICE_STARTER")
                .expect("STRIPE_PRICE_STARTER must be set"),
            price_studio: env::var("STRIPE_PRICE_STUDIO").expect("STRIPE_PRICE_STUDIO must be set"),
            price_agency: env::var("STRIPE_PRICE_AGENCY").expect("STRIPE_PRICE_AGENCY must be set"),
        };

        let auth_cookie_secure = env::var("AUTH_COOKIE_SECURE")
            .map(|v| v.to_lowercase() != "false")
            .unwrap_or(true);

        Config {
            database_url,
            frontend_origin,
            stripe,
            auth_cookie_secure,
        }
    }
}
