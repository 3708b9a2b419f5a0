//! Maps operations onto HTTP requests against the management endpoints.

use hal_dmr::names::{INHERITED, LOCALE, OPERATIONS, PROXIES, READ_RESOURCE_DESCRIPTION_OPERATION, RECURSIVE};
use hal_dmr::Operation;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::config::Endpoints;
use crate::error::DispatchError;
use crate::transport::{HttpMethod, HttpRequest, RequestBody, UploadFile};

/// Optional parameters of `read-resource-description` that map onto query parameters.
/// `locale` is accepted by the server although it is not documented.
pub const READ_RESOURCE_DESCRIPTION_OPTIONAL_PARAMETERS: [&str; 5] =
    [RECURSIVE, PROXIES, OPERATIONS, INHERITED, LOCALE];

/// Characters `encodeURI` leaves untouched: URL structure stays intact.
const ENCODE_URI: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b';')
    .remove(b',')
    .remove(b'/')
    .remove(b'?')
    .remove(b':')
    .remove(b'@')
    .remove(b'&')
    .remove(b'=')
    .remove(b'+')
    .remove(b'$')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'#');

pub fn encode_uri(raw: &str) -> String {
    utf8_percent_encode(raw, ENCODE_URI).to_string()
}

/// `read-resource-description` becomes a GET against the resource's URL; anything else is a POST.
pub fn dmr_request(endpoints: &Endpoints, operation: &Operation) -> Result<HttpRequest, DispatchError> {
    if operation.name() == READ_RESOURCE_DESCRIPTION_OPERATION {
        let endpoint = endpoints.dmr.strip_suffix('/').unwrap_or(&endpoints.dmr);
        return Ok(HttpRequest {
            method: HttpMethod::Get,
            url: encode_uri(&format!("{endpoint}{}", description_path(operation))),
            body: RequestBody::Empty,
        });
    }
    let encoded = operation
        .to_base64()
        .map_err(|error| DispatchError::InvalidRequest(error.to_string()))?;
    Ok(HttpRequest {
        method: HttpMethod::Post,
        url: endpoints.dmr.clone(),
        body: RequestBody::Dmr(encoded),
    })
}

pub fn upload_request(endpoints: &Endpoints, file: UploadFile, operation: &Operation) -> HttpRequest {
    HttpRequest {
        method: HttpMethod::Post,
        url: endpoints.upload.clone(),
        body: RequestBody::Upload {
            file,
            operation: operation.to_json_string(),
        },
    }
}

fn description_path(operation: &Operation) -> String {
    let mut path = String::new();
    for (key, value) in operation.address().segments() {
        path.push('/');
        path.push_str(key);
        path.push('/');
        path.push_str(value);
    }
    path.push_str("?operation=resource-description");
    for name in READ_RESOURCE_DESCRIPTION_OPTIONAL_PARAMETERS {
        if let Some(value) = operation.parameter(name).filter(|value| value.is_defined()) {
            path.push('&');
            path.push_str(name);
            path.push('=');
            path.push_str(&value.as_string());
        }
    }
    path
}
