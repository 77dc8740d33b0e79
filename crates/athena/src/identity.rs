//! Caller identity lookup for result-location templates.

use aws_sdk_sts::error::DisplayErrorContext;
use tracing::debug;

use crate::error::AthenaError;

/// AWS account id of the credentials in `sdk_config`.
pub async fn account_id(sdk_config: &aws_types::SdkConfig) -> Result<String, AthenaError> {
    let client = aws_sdk_sts::Client::new(sdk_config);
    let resp = client
        .get_caller_identity()
        .send()
        .await
        .map_err(|e| AthenaError::Identity(DisplayErrorContext(&e).to_string()))?;

    let account = resp
        .account()
        .ok_or_else(|| AthenaError::Identity("no account in caller identity".into()))?
        .to_string();

    debug!(account = %account, "resolved caller identity");
    Ok(account)
}
