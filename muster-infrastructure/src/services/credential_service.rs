use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use muster_domain::{Clock, CredentialVerifier, Verification};

const TOKEN_PREFIX: &str = "muster";
const TOKEN_VERSION: &str = "v1";
const DAY_FORMAT: &str = "%Y%m%d";

type HmacSha256 = Hmac<Sha256>;

/// Issues a day pass: `muster.v1.<yyyymmdd>.<member>.<hex signature>`.
pub fn issue_pass(secret: &str, member_id: &str, day: NaiveDate) -> Result<String> {
    let day = day.format(DAY_FORMAT).to_string();
    let signature = sign_hmac_sha256(secret, &signing_payload(&day, member_id))?;
    Ok(format!(
        "{}.{}.{}.{}.{}",
        TOKEN_PREFIX, TOKEN_VERSION, day, member_id, signature
    ))
}

/// Checks the day pass a member presented against the shared secret and today's date.
pub struct PassTokenVerifier {
    secret: Option<String>,
    presented: Option<String>,
    clock: Arc<dyn Clock>,
}

impl PassTokenVerifier {
    pub fn new(secret: Option<String>, presented: Option<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            secret,
            presented,
            clock,
        }
    }

    fn check(&self, secret: &str, token: &str, member_id: &str) -> Result<Verification> {
        let mut head = token.trim().splitn(4, '.');
        let (Some(prefix), Some(version), Some(day), Some(rest)) =
            (head.next(), head.next(), head.next(), head.next())
        else {
            return Ok(Verification::Fail("malformed pass".to_string()));
        };
        let Some((member, signature)) = rest.rsplit_once('.') else {
            return Ok(Verification::Fail("malformed pass".to_string()));
        };
        if prefix != TOKEN_PREFIX || version != TOKEN_VERSION {
            return Ok(Verification::Fail("unsupported pass version".to_string()));
        }
        if member != member_id {
            return Ok(Verification::Fail("pass issued to another member".to_string()));
        }
        let today = self.clock.now().format(DAY_FORMAT).to_string();
        if day != today {
            return Ok(Verification::Fail("pass expired".to_string()));
        }
        let expected = sign_hmac_sha256(secret, &signing_payload(day, member))?;
        if !constant_time_eq(expected.as_bytes(), signature.as_bytes()) {
            return Ok(Verification::Fail("invalid pass signature".to_string()));
        }
        Ok(Verification::Pass)
    }
}

#[async_trait]
impl CredentialVerifier for PassTokenVerifier {
    async fn verify(&self, member_id: &str) -> Result<Verification> {
        let Some(secret) = self.secret.as_deref() else {
            return Err(anyhow!("pass_secret not configured"));
        };
        let Some(token) = self.presented.as_deref() else {
            return Ok(Verification::Fail("no pass presented".to_string()));
        };
        self.check(secret, token, member_id)
    }
}

fn signing_payload(day: &str, member_id: &str) -> String {
    format!("{}|{}|{}|{}", TOKEN_PREFIX, TOKEN_VERSION, day, member_id)
}

fn sign_hmac_sha256(secret: &str, payload: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|err| anyhow!("hmac init failed: {err}"))?;
    mac.update(payload.as_bytes());
    let digest = mac.finalize().into_bytes();

    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    Ok(out)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
