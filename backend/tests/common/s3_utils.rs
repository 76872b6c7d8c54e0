use aws_sdk_s3::Client as S3Client;
use backend::media_storage::StorageConfig;

/// Create the test bucket on LocalStack if it does not exist yet
pub async fn ensure_bucket(config: &StorageConfig) -> Result<S3Client, Box<dyn std::error::Error>> {
    let client = S3Client::from_conf(config.s3_client_config().await);

    if client
        .head_bucket()
        .bucket(&config.bucket)
        .send()
        .await
        .is_err()
    {
        client.create_bucket().bucket(&config.bucket).send().await?;
    }

    Ok(client)
}

/// Download data from a URL using HTTP
pub async fn download_from_url(url: &str) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let client = reqwest::Client::new();
    let response = client.get(url).send().await?;

    if response.status().is_success() {
        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    } else {
        Err(format!("Failed to download from {}: HTTP {}", url, response.status()).into())
    }
}
