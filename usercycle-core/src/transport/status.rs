//! Human-readable descriptions for the statuses the API documents

/// Description for `status`, if the API documents it
pub fn describe(status: u16) -> Option<&'static str> {
    let description = match status {
        200 => "200: Success (upon a successful GET, PUT, or DELETE request)",
        201 => "201: Created (upon a successful POST request)",
        400 => "400: Resource Invalid (improperly-formatted request)",
        401 => "401: Unauthorized (incorrect or missing authentication credentials)",
        404 => "404: Resource Not Found (requesting a non-existent person or other resource)",
        405 => "405: Method Not Allowed (e.g., trying to POST to a URL that responds only to GET)",
        406 => "406: Not Acceptable (server can't satisfy the Accept header specified by the client)",
        422 => "422: Unprocessable Entity (The request was well-formed but was unable to be followed due to semantic errors)",
        500 => "500: Server Error",
        _ => return None,
    };
    Some(description)
}
