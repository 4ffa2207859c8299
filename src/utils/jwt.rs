use std::env;

use jsonwebtoken::{
    decode, encode, errors::Error, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header,
    TokenData, Validation,
};

use crate::routes::auth::claims::Claims;

fn secret() -> Result<String, Error> {
    env::var("JWT_SECRET").map_err(|_| Error::from(ErrorKind::InvalidKeyFormat))
}

pub fn create_jwt(claims: &Claims) -> Result<String, Error> {
    let secret = secret()?;
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn decode_jwt(token: &str) -> Result<TokenData<Claims>, Error> {
    let secret = secret()?;
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    validation.required_spec_claims.insert("exp".to_string());
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
}
