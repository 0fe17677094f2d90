use crate::cipher::CipherSpec;
use crate::config::{
    FILE_VERSION, FLAG_ENCRYPTED, HEADER_EXTENT_COUNT, HEADER_EXTENT_SIZE, HEADER_SIZE, MAGIC_MARKER, PACKET_SET_OFFSET, S2K_COUNT_BYTE, S2K_HASH_MD5, S2K_SALTED_ITERATED, TAG_3_PACKET, TAG_3_VERSION,
    TAG_11_FILENAME, TAG_11_FORMAT, TAG_11_PACKET,
};
use crate::error::{Error, Result};
use crate::packet;
use crate::types::{Salt, Signature};

pub struct SerializeParams<'a> {
    pub declared_size: u64,

    pub marker2: u32,

    pub spec: CipherSpec,

    pub salt: &'a Salt,

    pub wrapped_key: &'a [u8],

    pub signature: &'a Signature,
}

pub fn serialize(params: &SerializeParams<'_>) -> Result<Vec<u8>> {
    let size = i64::try_from(params.declared_size).map_err(|_| Error::InvalidInput(format!("file size {} exceeds the header range", params.declared_size)))?;
    if params.wrapped_key.len() != params.spec.wrapped_key_size() {
        return Err(Error::InvalidInput(format!("wrapped key of {} bytes, {} expects {}", params.wrapped_key.len(), params.spec, params.spec.wrapped_key_size())));
    }

    let mut header = Vec::with_capacity(HEADER_SIZE);
    header.extend_from_slice(&size.to_be_bytes());
    header.extend_from_slice(&(params.marker2 ^ MAGIC_MARKER).to_be_bytes());
    header.extend_from_slice(&params.marker2.to_be_bytes());
    header.push(FILE_VERSION);
    header.extend_from_slice(&[0, 0]);
    header.push(FLAG_ENCRYPTED);
    header.extend_from_slice(&HEADER_EXTENT_SIZE.to_be_bytes());
    header.extend_from_slice(&HEADER_EXTENT_COUNT.to_be_bytes());
    debug_assert_eq!(header.len(), PACKET_SET_OFFSET);

    let tag_3 = tag_3_body(params);
    header.push(TAG_3_PACKET);
    packet::write_length(&mut header, tag_3.len())?;
    header.extend_from_slice(&tag_3);

    let tag_11 = tag_11_body(params.signature);
    header.push(TAG_11_PACKET);
    packet::write_length(&mut header, tag_11.len())?;
    header.extend_from_slice(&tag_11);

    header.resize(HEADER_SIZE, 0);
    Ok(header)
}

fn tag_3_body(params: &SerializeParams<'_>) -> Vec<u8> {
    let mut body = vec![TAG_3_VERSION, params.spec.code(), S2K_SALTED_ITERATED, S2K_HASH_MD5];
    body.extend_from_slice(params.salt.as_bytes());
    body.push(S2K_COUNT_BYTE);
    body.extend_from_slice(params.wrapped_key);
    body
}

fn tag_11_body(signature: &Signature) -> Vec<u8> {
    let mut body = vec![TAG_11_FORMAT, TAG_11_FILENAME.len() as u8];
    body.extend_from_slice(TAG_11_FILENAME);
    body.extend_from_slice(&[0u8; 4]);
    body.extend_from_slice(signature.as_bytes());
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::CipherFamily;
    use crate::header::deserializer;

    const AES_16: &[u8] = include_bytes!("../../testdata/aes-16.raw");

    #[test]
    fn test_matches_fixture_layout() {
        let fixture = deserializer::parse(AES_16).unwrap();
        let spec = CipherSpec::new(CipherFamily::Aes, 16).unwrap();
        let params = SerializeParams {
            declared_size: fixture.declared_size(),
            marker2: fixture.markers().1,
            spec,
            salt: fixture.salt(),
            wrapped_key: fixture.wrapped_key(16).unwrap(),
            signature: fixture.signature().unwrap(),
        };

        let built = serialize(&params).unwrap();
        assert_eq!(built.len(), HEADER_SIZE);
        assert_eq!(built, &AES_16[..HEADER_SIZE]);
    }

    #[test]
    fn test_roundtrip_fields() {
        let spec = CipherSpec::new(CipherFamily::Aes, 24).unwrap();
        let wrapped = [0xa5u8; 32];
        let salt = Salt::new([9; 8]);
        let signature = Signature::new([7; 8]);
        let params = SerializeParams { declared_size: 1 << 40, marker2: 0xdead_beef, spec, salt: &salt, wrapped_key: &wrapped, signature: &signature };

        let parsed = deserializer::parse(&serialize(&params).unwrap()).unwrap();
        assert_eq!(parsed.declared_size(), 1 << 40);
        assert_eq!(parsed.cipher_code(), 0x08);
        assert_eq!(*parsed.salt(), salt);
        assert_eq!(parsed.recorded_wrapped_key_len(), Some(32));
        assert_eq!(parsed.wrapped_key(32).unwrap(), &wrapped);
        assert_eq!(parsed.signature(), Some(&signature));
    }

    #[test]
    fn test_rejects_wrong_wrapped_length() {
        let spec = CipherSpec::new(CipherFamily::Aes, 24).unwrap();
        let salt = Salt::DEFAULT;
        let signature = Signature::new([0; 8]);
        let params = SerializeParams { declared_size: 0, marker2: 0, spec, salt: &salt, wrapped_key: &[0u8; 24], signature: &signature };
        assert!(matches!(serialize(&params), Err(Error::InvalidInput(_))));
    }
}
