//! OpenAPI description of the HTTP surface

use serde_json::{json, Value};

/// Static OpenAPI 3 document served at `/api-docs/openapi.json`
pub fn openapi_document() -> Value {
    let error_envelope = json!({
        "type": "object",
        "properties": {
            "success": { "type": "boolean" },
            "message": { "type": "string" },
            "code": { "type": "string" }
        }
    });

    json!({
        "openapi": "3.0.3",
        "info": {
            "title": "s3gate",
            "description": "REST API for browsing, downloading and uploading S3 objects",
            "version": env!("CARGO_PKG_VERSION")
        },
        "paths": {
            "/api/buckets": {
                "get": {
                    "summary": "List buckets",
                    "responses": {
                        "200": {
                            "description": "Buckets visible to the gateway credentials",
                            "content": { "application/json": { "schema": {
                                "type": "object",
                                "properties": {
                                    "success": { "type": "boolean" },
                                    "count": { "type": "integer" },
                                    "buckets": {
                                        "type": "array",
                                        "items": {
                                            "type": "object",
                                            "properties": {
                                                "name": { "type": "string" },
                                                "creationDate": { "type": "string", "format": "date-time" }
                                            }
                                        }
                                    }
                                }
                            } } }
                        },
                        "500": { "description": "Provider failure", "content": { "application/json": { "schema": error_envelope } } }
                    }
                }
            },
            "/api/buckets/{bucketName}/objects": {
                "get": {
                    "summary": "List objects in a bucket",
                    "parameters": [
                        { "name": "bucketName", "in": "path", "required": true, "schema": { "type": "string" } },
                        { "name": "prefix", "in": "query", "schema": { "type": "string" } },
                        { "name": "maxKeys", "in": "query", "schema": { "type": "string", "pattern": "^[0-9]+$" } },
                        { "name": "continuationToken", "in": "query", "schema": { "type": "string" } }
                    ],
                    "responses": {
                        "200": {
                            "description": "One page of objects",
                            "content": { "application/json": { "schema": {
                                "type": "object",
                                "properties": {
                                    "success": { "type": "boolean" },
                                    "bucket": { "type": "string" },
                                    "prefix": { "type": "string", "nullable": true },
                                    "isTruncated": { "type": "boolean" },
                                    "nextContinuationToken": { "type": "string", "nullable": true },
                                    "count": { "type": "integer" },
                                    "objects": {
                                        "type": "array",
                                        "items": {
                                            "type": "object",
                                            "properties": {
                                                "key": { "type": "string" },
                                                "size": { "type": "integer" },
                                                "lastModified": { "type": "string", "format": "date-time" },
                                                "eTag": { "type": "string" },
                                                "storageClass": { "type": "string" }
                                            }
                                        }
                                    }
                                }
                            } } }
                        },
                        "400": { "description": "Invalid query parameters", "content": { "application/json": { "schema": error_envelope } } },
                        "500": { "description": "Provider failure", "content": { "application/json": { "schema": error_envelope } } }
                    }
                }
            },
            "/api/buckets/{bucketName}/objects/{objectKey}": {
                "get": {
                    "summary": "Download an object",
                    "description": "objectKey is the remainder of the path and may contain slashes or percent-encoded characters.",
                    "parameters": [
                        { "name": "bucketName", "in": "path", "required": true, "schema": { "type": "string" } },
                        { "name": "objectKey", "in": "path", "required": true, "schema": { "type": "string" } },
                        { "name": "download", "in": "query", "schema": { "type": "string", "enum": ["true", "false"] } }
                    ],
                    "responses": {
                        "200": { "description": "Object body", "content": { "application/octet-stream": { "schema": { "type": "string", "format": "binary" } } } },
                        "204": { "description": "Provider returned no body" },
                        "400": { "description": "Invalid query parameters", "content": { "application/json": { "schema": error_envelope } } },
                        "500": { "description": "Provider failure, including missing objects", "content": { "application/json": { "schema": error_envelope } } }
                    }
                }
            },
            "/upload": {
                "get": {
                    "summary": "Upload form",
                    "responses": { "200": { "description": "HTML form", "content": { "text/html": {} } } }
                },
                "post": {
                    "summary": "Upload a file and get a pre-signed download URL",
                    "requestBody": {
                        "required": true,
                        "content": { "multipart/form-data": { "schema": {
                            "type": "object",
                            "properties": { "apk": { "type": "string", "format": "binary" } }
                        } } }
                    },
                    "responses": {
                        "200": { "description": "Upload stored", "content": { "application/json": { "schema": {
                            "type": "object",
                            "properties": { "downloadUrl": { "type": "string" } }
                        } } } },
                        "400": { "description": "No file part in the request" },
                        "413": { "description": "Upload exceeds the size limit" }
                    }
                }
            },
            "/hello": {
                "get": {
                    "summary": "Smoke test",
                    "responses": { "200": { "description": "Always {\"message\":\"hi\"}" } }
                }
            }
        }
    })
}
