use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;

use super::{
    DynHttpTransport, HttpBodyStream, HttpRequest, HttpResponse, HttpStreamResponse,
    HttpTransport, TransportError,
};

/// 基于 reqwest 的默认 HttpTransport
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// 使用自定义 reqwest::Client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// 创建默认配置
    pub fn default_client() -> Result<Self, TransportError> {
        Client::builder()
            .build()
            .map(Self::new)
            .map_err(|err| TransportError::request(format!("failed to create reqwest client: {err}")))
    }

    fn build_request(
        &self,
        mut request: HttpRequest,
    ) -> Result<reqwest::RequestBuilder, TransportError> {
        let mut builder = self.client.post(&request.url);

        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        for (name, value) in request.headers.drain() {
            let header_name = reqwest::header::HeaderName::from_bytes(name.as_bytes())
                .map_err(|err| TransportError::InvalidHeader {
                    message: format!("invalid header name: {err}"),
                })?;
            let header_value =
                reqwest::header::HeaderValue::from_str(&value).map_err(|err| {
                    TransportError::InvalidHeader {
                        message: format!("invalid header value for {header_name}: {err}"),
                    }
                })?;
            builder = builder.header(header_name, header_value);
        }

        Ok(builder.body(request.body))
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        ReqwestTransport::default_client().expect("failed to initialize default reqwest transport")
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let response = self
            .build_request(request)?
            .send()
            .await
            .map_err(|err| TransportError::request(err.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|err| TransportError::body(err.to_string()))?
            .to_vec();

        Ok(HttpResponse { status, body })
    }

    async fn send_stream(
        &self,
        request: HttpRequest,
    ) -> Result<HttpStreamResponse, TransportError> {
        let response = self
            .build_request(request)?
            .send()
            .await
            .map_err(|err| TransportError::request(err.to_string()))?;

        let status = response.status().as_u16();
        let stream = response.bytes_stream().map(|chunk| {
            chunk
                .map(|bytes| bytes.to_vec())
                .map_err(|err| TransportError::body(err.to_string()))
        });
        let body: HttpBodyStream = Box::pin(stream);

        Ok(HttpStreamResponse { status, body })
    }
}

/// 便捷构造线程安全 Transport
pub fn default_dyn_transport() -> Result<DynHttpTransport, TransportError> {
    Ok(Arc::new(ReqwestTransport::default()))
}
