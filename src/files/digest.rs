//! Streaming digest computation for stored files and request bodies

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384, Sha512};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Digest algorithms the API can compute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    Md5,
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl DigestAlgorithm {
    /// Parse a client-supplied algorithm name, case-insensitively.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "md5" => Some(Self::Md5),
            "sha1" => Some(Self::Sha1),
            "sha256" => Some(Self::Sha256),
            "sha384" => Some(Self::Sha384),
            "sha512" => Some(Self::Sha512),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Md5 => "MD5",
            Self::Sha1 => "SHA1",
            Self::Sha256 => "SHA256",
            Self::Sha384 => "SHA384",
            Self::Sha512 => "SHA512",
        }
    }
}

/// Hash everything `reader` yields and return the digest as uppercase hex.
pub async fn hash_reader<R>(algorithm: DigestAlgorithm, reader: &mut R) -> std::io::Result<String>
where
    R: AsyncRead + Unpin + ?Sized,
{
    match algorithm {
        DigestAlgorithm::Md5 => digest_stream::<Md5, _>(reader).await,
        DigestAlgorithm::Sha1 => digest_stream::<Sha1, _>(reader).await,
        DigestAlgorithm::Sha256 => digest_stream::<Sha256, _>(reader).await,
        DigestAlgorithm::Sha384 => digest_stream::<Sha384, _>(reader).await,
        DigestAlgorithm::Sha512 => digest_stream::<Sha512, _>(reader).await,
    }
}

async fn digest_stream<D, R>(reader: &mut R) -> std::io::Result<String>
where
    D: Digest,
    R: AsyncRead + Unpin + ?Sized,
{
    let mut hasher = D::new();
    let mut buf = [0u8; 8192];
    loop {
        let read = reader.read(&mut buf).await?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    Ok(hex::encode_upper(hasher.finalize()))
}
