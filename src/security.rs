//! 标识符令牌编解码
//!
//! 内部对象ID不会直接暴露给客户端，跨越边界前统一编码为带签名的令牌，
//! 令牌格式：base64url( 12字节ObjectId ‖ HMAC-SHA256前8字节 )

use crate::error::{ErrorCode, ErrorDetail, QuickRestError, QuickRestResult};
use arc_swap::ArcSwap;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use bson::oid::ObjectId;
use hmac::{Hmac, Mac};
use once_cell::sync::Lazy;
use rat_logger::{info, warn};
use sha2::Sha256;
use std::sync::Arc;

type HmacSha256 = Hmac<Sha256>;

/// 签名截断长度
const TAG_LEN: usize = 8;
/// ObjectId 字节长度
const OID_LEN: usize = 12;

/// 未配置密钥时使用的默认密钥
pub const DEFAULT_ID_SECRET: &str = "1234567890123455";

/// 标识符令牌编解码器
#[derive(Clone)]
pub struct IdCodec {
    mac: HmacSha256,
}

impl std::fmt::Debug for IdCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdCodec").finish_non_exhaustive()
    }
}

impl IdCodec {
    /// 使用给定密钥创建编解码器
    pub fn new(secret: &str) -> Self {
        // HMAC 接受任意长度的密钥
        let mac = <HmacSha256 as Mac>::new_from_slice(secret.as_bytes())
            .expect("严重错误：HMAC-SHA256 拒绝了密钥");
        Self { mac }
    }

    fn tag(&self, id_bytes: &[u8]) -> HmacSha256 {
        let mut mac = self.mac.clone();
        mac.update(id_bytes);
        mac
    }

    /// 编码对象ID为外部令牌
    pub fn encode(&self, id: &ObjectId) -> String {
        let bytes = id.bytes();
        let tag = self.tag(&bytes).finalize().into_bytes();
        let mut buf = Vec::with_capacity(OID_LEN + TAG_LEN);
        buf.extend_from_slice(&bytes);
        buf.extend_from_slice(&tag[..TAG_LEN]);
        URL_SAFE_NO_PAD.encode(buf)
    }

    /// 解码外部令牌，签名不符或格式错误都视为无效ID
    pub fn decode(&self, token: &str) -> QuickRestResult<ObjectId> {
        let raw = URL_SAFE_NO_PAD
            .decode(token.trim())
            .map_err(|_| invalid_object_id(token))?;
        if raw.len() != OID_LEN + TAG_LEN {
            return Err(invalid_object_id(token));
        }
        self.tag(&raw[..OID_LEN])
            .verify_truncated_left(&raw[OID_LEN..])
            .map_err(|_| invalid_object_id(token))?;

        let mut bytes = [0u8; OID_LEN];
        bytes.copy_from_slice(&raw[..OID_LEN]);
        Ok(ObjectId::from_bytes(bytes))
    }
}

fn invalid_object_id(token: &str) -> QuickRestError {
    QuickRestError::ValidationError {
        detail: ErrorDetail::code_with(ErrorCode::InvalidObjectId, &[("id", token)]),
    }
}

static ID_CODEC: Lazy<ArcSwap<IdCodec>> =
    Lazy::new(|| ArcSwap::from_pointee(IdCodec::new(DEFAULT_ID_SECRET)));

/// 按密钥安装进程级编解码器
pub fn install_id_secret(secret: &str) {
    if secret == DEFAULT_ID_SECRET {
        warn!("ID令牌仍在使用默认密钥，生产环境请通过 SecurityConfig 设置");
    }
    install_id_codec(IdCodec::new(secret));
}

/// 安装进程级编解码器
pub fn install_id_codec(codec: IdCodec) {
    ID_CODEC.store(Arc::new(codec));
    info!("ID令牌编解码器已更新");
}

/// 当前进程级编解码器
pub fn id_codec() -> Arc<IdCodec> {
    ID_CODEC.load_full()
}

/// 使用进程级编解码器编码
pub fn encode_id(id: &ObjectId) -> String {
    ID_CODEC.load().encode(id)
}

/// 使用进程级编解码器解码
pub fn decode_id(token: &str) -> QuickRestResult<ObjectId> {
    ID_CODEC.load().decode(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let codec = IdCodec::new("unit-test-secret");
        for _ in 0..32 {
            let id = ObjectId::new();
            let token = codec.encode(&id);
            assert_eq!(codec.decode(&token).unwrap(), id);
        }
    }

    #[test]
    fn test_rejects_foreign_and_tampered_tokens() {
        let codec = IdCodec::new("secret-a");
        let other = IdCodec::new("secret-b");
        let id = ObjectId::new();
        let token = codec.encode(&id);

        assert!(other.decode(&token).is_err());
        assert!(codec.decode("not a token").is_err());
        assert!(codec.decode(&id.to_hex()).is_err());

        let mut raw = URL_SAFE_NO_PAD.decode(&token).unwrap();
        raw[0] ^= 0x01;
        let tampered = URL_SAFE_NO_PAD.encode(raw);
        let err = codec.decode(&tampered).unwrap_err();
        assert_eq!(err.detail().and_then(|d| d.leaf_code()), Some(ErrorCode::InvalidObjectId));
    }

    #[test]
    fn test_long_secret() {
        let codec = IdCodec::new(&"k".repeat(200));
        let id = ObjectId::new();
        assert_eq!(codec.decode(&codec.encode(&id)).unwrap(), id);

        let mut near = "k".repeat(199);
        near.push('j');
        let other = IdCodec::new(&near);
        assert!(other.decode(&codec.encode(&id)).is_err());
        assert!(IdCodec::new("").decode(&codec.encode(&id)).is_err());
    }
}
