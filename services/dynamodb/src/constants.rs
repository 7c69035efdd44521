// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use percent_encoding::AsciiSet;
use percent_encoding::NON_ALPHANUMERIC;

// Headers used by the service.
pub const X_AMZ_DATE: &str = "x-amz-date";
pub const X_AMZ_SECURITY_TOKEN: &str = "x-amz-security-token";
pub const X_AMZ_TARGET: &str = "x-amz-target";
pub const X_AMZN_AUTHORIZATION: &str = "x-amzn-authorization";
pub const X_AMZN_REQUEST_ID: &str = "x-amzn-requestid";

// Env values used to build a config.
pub const AWS_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
pub const AWS_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
pub const AWS_SESSION_TOKEN: &str = "AWS_SESSION_TOKEN";
pub const AWS_SESSION_EXPIRATION: &str = "AWS_SESSION_EXPIRATION";
pub const AWS_STS_ENDPOINT: &str = "AWS_STS_ENDPOINT";
pub const DYNAMODB_ENDPOINT: &str = "DYNAMODB_ENDPOINT";
pub const DYNAMODB_MAX_RETRIES: &str = "DYNAMODB_MAX_RETRIES";

/// Service version prefix of every `x-amz-target`.
pub const TARGET_PREFIX: &str = "DynamoDB_20111205";
/// Content type of every request body.
pub const CONTENT_TYPE_JSON: &str = "application/x-amz-json-1.0";

pub const DEFAULT_ENDPOINT: &str = "dynamodb.us-east-1.amazonaws.com";
pub const DEFAULT_STS_ENDPOINT: &str = "sts.amazonaws.com";
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Throttled requests are retried at most this many times.
pub const MAX_THROTTLE_RETRIES: u32 = 10;

/// Session tokens are requested for one hour.
pub const SESSION_DURATION_SECONDS: u32 = 3600;
pub const STS_VERSION: &str = "2011-06-15";

/// AsciiSet for [AWS UriEncode](https://docs.aws.amazon.com/AmazonS3/latest/API/sig-v4-header-based-auth.html)
///
/// Used for the signature v2 query of the session token request.
pub static AWS_QUERY_ENCODE_SET: AsciiSet = NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');
