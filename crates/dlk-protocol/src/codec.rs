use std::io::{Read, Write};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{trace, warn};

use crate::error::{ProtocolError, ProtocolResult};
use crate::message::{ProxyRequest, ProxyResponse, MAX_MESSAGE_SIZE};

/// A message that can travel in a frame.
pub trait Frame: Serialize + DeserializeOwned {
    fn type_tag(&self) -> u8;
    fn type_name(&self) -> &'static str;
}

impl Frame for ProxyRequest {
    fn type_tag(&self) -> u8 {
        ProxyRequest::type_tag(self)
    }

    fn type_name(&self) -> &'static str {
        ProxyRequest::type_name(self)
    }
}

impl Frame for ProxyResponse {
    fn type_tag(&self) -> u8 {
        ProxyResponse::type_tag(self)
    }

    fn type_name(&self) -> &'static str {
        ProxyResponse::type_name(self)
    }
}

/// Codec for RPC frames: `[4 bytes BE len][1 byte tag][bincode payload]`,
/// where `len` counts the tag and the payload.
pub struct FrameCodec;

impl FrameCodec {
    pub fn encode<M: Frame>(msg: &M) -> ProtocolResult<Vec<u8>> {
        let payload =
            bincode::serialize(msg).map_err(|e| ProtocolError::Serialization(e.to_string()))?;
        if payload.len() > MAX_MESSAGE_SIZE {
            warn!(
                message = msg.type_name(),
                size = payload.len(),
                max = MAX_MESSAGE_SIZE,
                "refusing to encode oversized frame"
            );
            return Err(ProtocolError::MessageTooLarge {
                size: payload.len(),
                max: MAX_MESSAGE_SIZE,
            });
        }
        let len = (payload.len() + 1) as u32;
        let mut buf = Vec::with_capacity(4 + 1 + payload.len());
        buf.extend_from_slice(&len.to_be_bytes());
        buf.push(msg.type_tag());
        buf.extend_from_slice(&payload);
        trace!(message = msg.type_name(), bytes = buf.len(), "frame encoded");
        Ok(buf)
    }

    /// Decode a framed message. Returns (message, bytes_consumed).
    pub fn decode<M: Frame>(data: &[u8]) -> ProtocolResult<(M, usize)> {
        if data.len() < 5 {
            return Err(ProtocolError::FramingError("too short".into()));
        }
        let len = Self::body_len([data[0], data[1], data[2], data[3]])?;
        let total = 4 + len;
        if data.len() < total {
            return Err(ProtocolError::FramingError(format!(
                "incomplete: have {}, need {}",
                data.len(),
                total
            )));
        }
        let msg = Self::decode_body(&data[4..total])?;
        Ok((msg, total))
    }

    /// Write one frame and flush.
    pub fn write_frame<M: Frame, W: Write>(writer: &mut W, msg: &M) -> ProtocolResult<()> {
        writer.write_all(&Self::encode(msg)?)?;
        writer.flush()?;
        Ok(())
    }

    /// Read exactly one frame.
    pub fn read_frame<M: Frame, R: Read>(reader: &mut R) -> ProtocolResult<M> {
        let mut header = [0u8; 4];
        reader.read_exact(&mut header)?;
        let len = Self::body_len(header)?;
        let mut body = vec![0u8; len];
        reader.read_exact(&mut body)?;
        Self::decode_body(&body)
    }

    /// Read one frame. Returns `Ok(None)` when the peer closed the stream
    /// cleanly before a new frame started.
    pub async fn read_frame_async<M: Frame, R: AsyncRead + Unpin>(
        reader: &mut R,
    ) -> ProtocolResult<Option<M>> {
        let mut header = [0u8; 4];
        match reader.read_exact(&mut header).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }
        let len = Self::body_len(header)?;
        let mut body = vec![0u8; len];
        reader.read_exact(&mut body).await?;
        Self::decode_body(&body).map(Some)
    }

    pub async fn write_frame_async<M: Frame, W: AsyncWrite + Unpin>(
        writer: &mut W,
        msg: &M,
    ) -> ProtocolResult<()> {
        writer.write_all(&Self::encode(msg)?).await?;
        writer.flush().await?;
        Ok(())
    }

    fn body_len(header: [u8; 4]) -> ProtocolResult<usize> {
        let len = u32::from_be_bytes(header) as usize;
        if len < 1 {
            return Err(ProtocolError::FramingError("zero-length frame".into()));
        }
        if len - 1 > MAX_MESSAGE_SIZE {
            warn!(size = len - 1, max = MAX_MESSAGE_SIZE, "rejecting oversized frame header");
            return Err(ProtocolError::MessageTooLarge {
                size: len - 1,
                max: MAX_MESSAGE_SIZE,
            });
        }
        Ok(len)
    }

    /// `body` is the tag byte followed by the payload.
    fn decode_body<M: Frame>(body: &[u8]) -> ProtocolResult<M> {
        let tag = body[0];
        let msg: M = bincode::deserialize(&body[1..])
            .map_err(|e| ProtocolError::Deserialization(e.to_string()))?;
        if msg.type_tag() != tag {
            return Err(ProtocolError::InvalidMessageType(tag));
        }
        Ok(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dlk_types::{DataObject, Grid, Image, ObjectKind, Signal};

    fn signal() -> DataObject {
        Signal::new("s1", vec![0.0, 1.0], vec![2.0, 3.0]).unwrap().into()
    }

    #[test]
    fn request_with_object_survives_framing() {
        let msg = ProxyRequest::AddObject { object: signal() };
        let encoded = FrameCodec::encode(&msg).unwrap();
        let (decoded, consumed) = FrameCodec::decode::<ProxyRequest>(&encoded).unwrap();
        assert_eq!(consumed, encoded.len());
        assert_eq!(decoded, msg);
    }

    #[test]
    fn image_response_survives_framing() {
        let image: DataObject = Image::new("i1", Grid::filled(3, 2, 0.5)).into();
        let msg = ProxyResponse::Object(image);
        let encoded = FrameCodec::encode(&msg).unwrap();
        let (decoded, _) = FrameCodec::decode::<ProxyResponse>(&encoded).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn type_tags_unique() {
        let requests = vec![
            ProxyRequest::GetVersion,
            ProxyRequest::GetMethodList,
            ProxyRequest::GetObjectTitles { panel: ObjectKind::Signal },
            ProxyRequest::GetObject { title: String::new(), panel: ObjectKind::Image },
            ProxyRequest::AddObject { object: signal() },
            ProxyRequest::SelectObjects { titles: vec![], panel: ObjectKind::Signal },
            ProxyRequest::RemoveObject { force: true },
            ProxyRequest::ResetAll,
            ProxyRequest::SaveWorkspace { path: String::new() },
            ProxyRequest::LoadWorkspace { paths: vec![], reset_all: false },
            ProxyRequest::Calc { name: String::new(), params: None },
        ];
        let responses = vec![
            ProxyResponse::Version(String::new()),
            ProxyResponse::Methods(vec![]),
            ProxyResponse::Titles(vec![]),
            ProxyResponse::Object(signal()),
            ProxyResponse::Ack,
            ProxyResponse::CalcResult(None),
            ProxyResponse::error(500, ""),
        ];
        let mut tags: Vec<u8> = requests
            .iter()
            .map(ProxyRequest::type_tag)
            .chain(responses.iter().map(ProxyResponse::type_tag))
            .collect();
        let len = tags.len();
        tags.sort();
        tags.dedup();
        assert_eq!(tags.len(), len, "type tags should be unique");
    }

    #[test]
    fn stream_roundtrip() {
        let mut buf = Vec::new();
        FrameCodec::write_frame(&mut buf, &ProxyRequest::GetVersion).unwrap();
        FrameCodec::write_frame(&mut buf, &ProxyRequest::ResetAll).unwrap();

        let mut reader = std::io::Cursor::new(buf);
        let first: ProxyRequest = FrameCodec::read_frame(&mut reader).unwrap();
        let second: ProxyRequest = FrameCodec::read_frame(&mut reader).unwrap();
        assert_eq!(first, ProxyRequest::GetVersion);
        assert_eq!(second, ProxyRequest::ResetAll);
    }

    #[tokio::test]
    async fn async_read_reports_clean_eof() {
        let mut buf = Vec::new();
        FrameCodec::write_frame(&mut buf, &ProxyResponse::Ack).unwrap();
        let mut reader = buf.as_slice();
        let msg: Option<ProxyResponse> = FrameCodec::read_frame_async(&mut reader).await.unwrap();
        assert_eq!(msg, Some(ProxyResponse::Ack));
        let eof: Option<ProxyResponse> = FrameCodec::read_frame_async(&mut reader).await.unwrap();
        assert!(eof.is_none());
    }

    #[test]
    fn mismatched_tag_rejected() {
        let mut encoded = FrameCodec::encode(&ProxyRequest::GetVersion).unwrap();
        encoded[4] = 99;
        let err = FrameCodec::decode::<ProxyRequest>(&encoded).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidMessageType(99)));
    }

    #[test]
    fn decode_truncated() {
        let err = FrameCodec::decode::<ProxyRequest>(&[0, 0, 0]).unwrap_err();
        assert!(matches!(err, ProtocolError::FramingError(_)));
    }

    #[test]
    fn decode_zero_length() {
        let data = [0u8, 0, 0, 0, 0];
        let err = FrameCodec::decode::<ProxyRequest>(&data).unwrap_err();
        assert!(matches!(err, ProtocolError::FramingError(_)));
    }

    #[test]
    fn oversized_header_rejected() {
        let mut data = u32::MAX.to_be_bytes().to_vec();
        data.push(1);
        let err = FrameCodec::decode::<ProxyRequest>(&data).unwrap_err();
        assert!(matches!(err, ProtocolError::MessageTooLarge { .. }));
    }
}
