use actix_multipart::Multipart;
use actix_web::http::header;
use actix_web::{Error, HttpRequest, HttpResponse, web};
use futures::{StreamExt, TryStreamExt};
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::advisor::AdvisorService;
use crate::classifier::Classifier;
use crate::error::AnalyzeError;
use crate::intake::{ImageSource, IntakeError, UploadStore};
use crate::weather::{WeatherSnapshot, manual_weather};

#[derive(Debug, Deserialize)]
struct AnalyzeJsonBody {
    image_base64: Option<String>,
    location: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DiagnosisResponse {
    pub pest: String,
    pub weather: WeatherSnapshot,
    pub cause: String,
    pub remedy: String,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/analyze").route(web::post().to(handle_analyze)))
        .service(web::resource("/health").route(web::get().to(health)));
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

/// Diagnosis pipeline: resolve image -> persist -> weather -> classify ->
/// cause -> remedy. Strictly sequential; the remedy prompt needs the cause
/// text, so the two generation calls cannot overlap.
async fn handle_analyze(
    req: HttpRequest,
    payload: web::Payload,
    classifier: web::Data<Classifier>,
    advisor: web::Data<AdvisorService>,
    uploads: web::Data<UploadStore>,
) -> Result<HttpResponse, Error> {
    let (source, location) = read_request(&req, payload).await?;

    let image_path = uploads.persist(source).map_err(AnalyzeError::from)?;
    info!("stored upload at {}", image_path.display());

    let weather = manual_weather(location);

    let pest = classifier.predict(&image_path).map_err(AnalyzeError::from)?;
    info!("classified {} as {}", image_path.display(), pest);

    let cause = advisor
        .probable_cause(pest, &weather)
        .await
        .map_err(AnalyzeError::from)?;
    let remedy = advisor
        .home_remedy(pest, &cause)
        .await
        .map_err(AnalyzeError::from)?;

    Ok(HttpResponse::Ok().json(DiagnosisResponse {
        pest: pest.to_string(),
        weather,
        cause,
        remedy,
    }))
}

async fn read_request(
    req: &HttpRequest,
    payload: web::Payload,
) -> Result<(ImageSource, Option<String>), Error> {
    if is_multipart(req) {
        read_multipart(Multipart::new(req.headers(), payload)).await
    } else {
        let body = collect_body(payload).await?;
        Ok(parse_json_request(&body)?)
    }
}

fn is_multipart(req: &HttpRequest) -> bool {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.starts_with("multipart/form-data"))
        .unwrap_or(false)
}

async fn collect_body(mut payload: web::Payload) -> Result<web::BytesMut, Error> {
    let mut body = web::BytesMut::new();
    while let Some(chunk) = payload.next().await {
        body.extend_from_slice(&chunk?);
    }
    Ok(body)
}

fn parse_json_request(body: &[u8]) -> Result<(ImageSource, Option<String>), AnalyzeError> {
    let parsed: AnalyzeJsonBody = serde_json::from_slice(body)
        .map_err(|e| AnalyzeError::BadRequest(format!("invalid JSON body: {}", e)))?;

    let source = parsed
        .image_base64
        .map(ImageSource::Base64)
        .ok_or(IntakeError::NoImage)?;
    Ok((source, parsed.location))
}

async fn read_multipart(
    mut multipart: Multipart,
) -> Result<(ImageSource, Option<String>), Error> {
    let mut upload: Option<ImageSource> = None;
    let mut inline_base64: Option<String> = None;
    let mut location: Option<String> = None;

    while let Ok(Some(mut field)) = multipart.try_next().await {
        let name = field.name().unwrap_or("").to_string();
        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_string);

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            data.extend_from_slice(&chunk?);
        }

        match name.as_str() {
            "image" => {
                upload = Some(ImageSource::Upload {
                    filename,
                    bytes: data,
                });
            }
            "image_base64" => {
                inline_base64 = Some(String::from_utf8_lossy(&data).into_owned());
            }
            "location" => {
                location = Some(String::from_utf8_lossy(&data).trim().to_string());
            }
            _ => {}
        }
    }

    // A file field wins over an inline base64 field when both are sent.
    let source = upload
        .or_else(|| inline_base64.map(ImageSource::Base64))
        .ok_or(AnalyzeError::from(IntakeError::NoImage))?;
    Ok((source, location))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_body_with_base64_resolves_to_a_source() {
        let body = br#"{"image_base64": "aGVsbG8=", "location": "Pune"}"#;
        let (source, location) = parse_json_request(body).unwrap();

        assert!(matches!(source, ImageSource::Base64(s) if s == "aGVsbG8="));
        assert_eq!(location.as_deref(), Some("Pune"));
    }

    #[test]
    fn json_body_without_location_leaves_it_absent() {
        let body = br#"{"image_base64": "aGVsbG8="}"#;
        let (_, location) = parse_json_request(body).unwrap();
        assert_eq!(location, None);
    }

    #[test]
    fn json_body_without_image_is_rejected() {
        let err = parse_json_request(br#"{"location": "Pune"}"#).unwrap_err();
        assert!(matches!(
            err,
            AnalyzeError::Intake(IntakeError::NoImage)
        ));
        assert_eq!(err.to_string(), "No image found");
    }

    #[test]
    fn malformed_json_is_rejected_as_bad_request() {
        let err = parse_json_request(b"not json").unwrap_err();
        assert!(matches!(err, AnalyzeError::BadRequest(_)));
    }

    #[test]
    fn diagnosis_response_serializes_all_four_fields() {
        let response = DiagnosisResponse {
            pest: "rust".to_string(),
            weather: manual_weather(Some("Pune".to_string())),
            cause: "humid air".to_string(),
            remedy: "neem oil spray".to_string(),
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["pest"], "rust");
        assert_eq!(json["weather"]["location"], "Pune");
        assert_eq!(json["cause"], "humid air");
        assert_eq!(json["remedy"], "neem oil spray");
    }
}
