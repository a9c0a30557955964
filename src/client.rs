// src/client.rs

use crate::{config::AppConfig, error::*};
use anyhow::anyhow;
use log::debug;
use reqwest::{IntoUrl, Response, header};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use std::{sync::Arc, time::Duration};

#[derive(Clone)]
pub struct RobustClient {
    pub client: ClientWithMiddleware,
    config: Arc<AppConfig>,
}

impl RobustClient {
    pub fn new(config: Arc<AppConfig>) -> AppResult<Self> {
        let retry_policy =
            ExponentialBackoff::builder().build_with_max_retries(config.max_retries);
        let inner = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.max_concurrent * 3)
            .build()
            .map_err(|e| AppError::Other(anyhow!("HTTP 客户端初始化失败: {}", e)))?;
        let client = ClientBuilder::new(inner)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self { client, config })
    }

    /// 发起流式 GET，非 2xx 状态视为传输失败。
    /// `explicit_user_agent` 为 true 时在请求上再显式设置一次 UA，部分 CDN 会拒绝默认标识。
    pub async fn get_stream<T: IntoUrl>(
        &self,
        url: T,
        timeout: Duration,
        explicit_user_agent: bool,
    ) -> AppResult<Response> {
        let mut request = self.client.get(url).timeout(timeout);
        if explicit_user_agent {
            request = request.header(header::USER_AGENT, self.config.user_agent.as_str());
        }
        let res = request.send().await?;
        debug!("GET {} -> {}", res.url(), res.status());
        Ok(res.error_for_status()?)
    }

    /// 一次性读取小体积资源（封面图片），返回内容与 Content-Type。
    pub async fn fetch_bytes<T: IntoUrl>(
        &self,
        url: T,
        timeout: Duration,
    ) -> AppResult<(Vec<u8>, Option<String>)> {
        let res = self.get_stream(url, timeout, false).await?;
        let content_type = content_type_of(&res);
        let body = res.bytes().await?;
        Ok((body.to_vec(), content_type))
    }
}

pub fn content_type_of(res: &Response) -> Option<String> {
    res.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
