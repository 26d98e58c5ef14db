//! Catalogue of coded errors the native Voice SDKs report.
//!
//! Generated from the Voice SDK error catalogue; regenerate rather than editing by hand.

/// Grouping the catalogue places each coded error under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorFamily {
    Authorization,
    Forbidden,
    Client,
    Server,
    SipServer,
    TwiMl,
    General,
    MalformedRequest,
    Registration,
    UserMedia,
    Signaling,
    Media,
}

/// Static metadata attached to every coded error.
#[derive(Debug, PartialEq, Eq)]
pub struct ErrorInfo {
    pub family: ErrorFamily,
    pub code: u32,
    pub name: &'static str,
    pub description: &'static str,
    pub explanation: &'static str,
    pub causes: &'static [&'static str],
    pub solutions: &'static [&'static str],
}

/// Every error code the native layer may reject a call with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TwilioErrorKind {
    AccessTokenInvalid,
    AccessTokenHeaderInvalid,
    AccessTokenIssuerInvalid,
    AccessTokenExpired,
    AccessTokenNotYetValid,
    AccessTokenGrantsInvalid,
    AccessTokenSignatureInvalid,
    AuthenticationFailed,
    ExpirationTimeExceedsMaxTimeAllowed,
    Forbidden,
    InvalidApplicationSid,
    ConnectionError,
    CallCancelledError,
    TransportError,
    MalformedRequestError,
    AuthorizationError,
    RateExceededError,
    CallMessageEventTypeInvalidError,
    CallMessageUnexpectedStateError,
    PayloadSizeExceededError,
    RegistrationError,
    UnsupportedCancelMessageError,
    BadRequest,
    PermissionDeniedError,
    ClientForbidden,
    NotFound,
    RequestTimeout,
    Conflict,
    UpgradeRequired,
    TooManyRequests,
    TemporarilyUnavailable,
    CallTransactionDoesNotExist,
    AddressIncomplete,
    BusyHere,
    RequestTerminated,
    InternalServerError,
    BadGateway,
    ServiceUnavailable,
    GatewayTimeout,
    DnsResolutionError,
    BusyEverywhere,
    Decline,
    DoesNotExistAnywhere,
    AccessTokenRejected,
    ConnectionDisconnected,
    ClientLocalDescFailed,
    ServerLocalDescFailed,
    ClientRemoteDescFailed,
    ServerRemoteDescFailed,
    NoSupportedCodec,
    MediaConnectionError,
    MediaDtlsTransportFailedError,
}

impl TwilioErrorKind {
    pub const ALL: [TwilioErrorKind; 52] = [
        Self::AccessTokenInvalid,
        Self::AccessTokenHeaderInvalid,
        Self::AccessTokenIssuerInvalid,
        Self::AccessTokenExpired,
        Self::AccessTokenNotYetValid,
        Self::AccessTokenGrantsInvalid,
        Self::AccessTokenSignatureInvalid,
        Self::AuthenticationFailed,
        Self::ExpirationTimeExceedsMaxTimeAllowed,
        Self::Forbidden,
        Self::InvalidApplicationSid,
        Self::ConnectionError,
        Self::CallCancelledError,
        Self::TransportError,
        Self::MalformedRequestError,
        Self::AuthorizationError,
        Self::RateExceededError,
        Self::CallMessageEventTypeInvalidError,
        Self::CallMessageUnexpectedStateError,
        Self::PayloadSizeExceededError,
        Self::RegistrationError,
        Self::UnsupportedCancelMessageError,
        Self::BadRequest,
        Self::PermissionDeniedError,
        Self::ClientForbidden,
        Self::NotFound,
        Self::RequestTimeout,
        Self::Conflict,
        Self::UpgradeRequired,
        Self::TooManyRequests,
        Self::TemporarilyUnavailable,
        Self::CallTransactionDoesNotExist,
        Self::AddressIncomplete,
        Self::BusyHere,
        Self::RequestTerminated,
        Self::InternalServerError,
        Self::BadGateway,
        Self::ServiceUnavailable,
        Self::GatewayTimeout,
        Self::DnsResolutionError,
        Self::BusyEverywhere,
        Self::Decline,
        Self::DoesNotExistAnywhere,
        Self::AccessTokenRejected,
        Self::ConnectionDisconnected,
        Self::ClientLocalDescFailed,
        Self::ServerLocalDescFailed,
        Self::ClientRemoteDescFailed,
        Self::ServerRemoteDescFailed,
        Self::NoSupportedCodec,
        Self::MediaConnectionError,
        Self::MediaDtlsTransportFailedError,
    ];

    /// Look up the error kind registered for a numeric code.
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            20101 => Some(Self::AccessTokenInvalid),
            20102 => Some(Self::AccessTokenHeaderInvalid),
            20103 => Some(Self::AccessTokenIssuerInvalid),
            20104 => Some(Self::AccessTokenExpired),
            20105 => Some(Self::AccessTokenNotYetValid),
            20106 => Some(Self::AccessTokenGrantsInvalid),
            20107 => Some(Self::AccessTokenSignatureInvalid),
            20151 => Some(Self::AuthenticationFailed),
            20157 => Some(Self::ExpirationTimeExceedsMaxTimeAllowed),
            20403 => Some(Self::Forbidden),
            21218 => Some(Self::InvalidApplicationSid),
            31005 => Some(Self::ConnectionError),
            31008 => Some(Self::CallCancelledError),
            31009 => Some(Self::TransportError),
            31100 => Some(Self::MalformedRequestError),
            31201 => Some(Self::AuthorizationError),
            31206 => Some(Self::RateExceededError),
            31210 => Some(Self::CallMessageEventTypeInvalidError),
            31211 => Some(Self::CallMessageUnexpectedStateError),
            31212 => Some(Self::PayloadSizeExceededError),
            31301 => Some(Self::RegistrationError),
            31302 => Some(Self::UnsupportedCancelMessageError),
            31400 => Some(Self::BadRequest),
            31401 => Some(Self::PermissionDeniedError),
            31403 => Some(Self::ClientForbidden),
            31404 => Some(Self::NotFound),
            31408 => Some(Self::RequestTimeout),
            31409 => Some(Self::Conflict),
            31426 => Some(Self::UpgradeRequired),
            31429 => Some(Self::TooManyRequests),
            31480 => Some(Self::TemporarilyUnavailable),
            31481 => Some(Self::CallTransactionDoesNotExist),
            31484 => Some(Self::AddressIncomplete),
            31486 => Some(Self::BusyHere),
            31487 => Some(Self::RequestTerminated),
            31500 => Some(Self::InternalServerError),
            31502 => Some(Self::BadGateway),
            31503 => Some(Self::ServiceUnavailable),
            31504 => Some(Self::GatewayTimeout),
            31530 => Some(Self::DnsResolutionError),
            31600 => Some(Self::BusyEverywhere),
            31603 => Some(Self::Decline),
            31604 => Some(Self::DoesNotExistAnywhere),
            51007 => Some(Self::AccessTokenRejected),
            53001 => Some(Self::ConnectionDisconnected),
            53400 => Some(Self::ClientLocalDescFailed),
            53401 => Some(Self::ServerLocalDescFailed),
            53402 => Some(Self::ClientRemoteDescFailed),
            53403 => Some(Self::ServerRemoteDescFailed),
            53404 => Some(Self::NoSupportedCodec),
            53405 => Some(Self::MediaConnectionError),
            53407 => Some(Self::MediaDtlsTransportFailedError),
            _ => None,
        }
    }

    pub fn code(self) -> u32 {
        self.info().code
    }

    pub fn name(self) -> &'static str {
        self.info().name
    }

    pub fn family(self) -> ErrorFamily {
        self.info().family
    }

    pub fn info(self) -> &'static ErrorInfo {
        match self {
            Self::AccessTokenInvalid => &ErrorInfo {
                family: ErrorFamily::Authorization,
                code: 20101,
                name: "AccessTokenInvalid",
                description: "Invalid access token",
                explanation: "Twilio was unable to validate your Access Token",
                causes: &[],
                solutions: &[],
            },
            Self::AccessTokenHeaderInvalid => &ErrorInfo {
                family: ErrorFamily::Authorization,
                code: 20102,
                name: "AccessTokenHeaderInvalid",
                description: "Invalid access token header",
                explanation: "The header of the Access Token provided to the Twilio API was invalid",
                causes: &[],
                solutions: &[],
            },
            Self::AccessTokenIssuerInvalid => &ErrorInfo {
                family: ErrorFamily::Authorization,
                code: 20103,
                name: "AccessTokenIssuerInvalid",
                description: "Invalid access token issuer/subject",
                explanation: "The issuer or subject of the Access Token provided to the Twilio API was invalid",
                causes: &[],
                solutions: &[],
            },
            Self::AccessTokenExpired => &ErrorInfo {
                family: ErrorFamily::Authorization,
                code: 20104,
                name: "AccessTokenExpired",
                description: "Access token expired or expiration date invalid",
                explanation: "The Access Token provided to the Twilio API has expired, the expiration time specified in the token was invalid, or the expiration time specified was too far in the future",
                causes: &[],
                solutions: &[],
            },
            Self::AccessTokenNotYetValid => &ErrorInfo {
                family: ErrorFamily::Authorization,
                code: 20105,
                name: "AccessTokenNotYetValid",
                description: "Access token not yet valid",
                explanation: "The Access Token provided to the Twilio API is not yet valid",
                causes: &[],
                solutions: &[],
            },
            Self::AccessTokenGrantsInvalid => &ErrorInfo {
                family: ErrorFamily::Authorization,
                code: 20106,
                name: "AccessTokenGrantsInvalid",
                description: "Invalid access token grants",
                explanation: "The Access Token signature and issuer were valid, but the grants specified in the token were invalid, unparseable, or did not authorize the action being requested",
                causes: &[],
                solutions: &[],
            },
            Self::AccessTokenSignatureInvalid => &ErrorInfo {
                family: ErrorFamily::Authorization,
                code: 20107,
                name: "AccessTokenSignatureInvalid",
                description: "Invalid access token signature",
                explanation: "The signature for the Access Token provided was invalid.",
                causes: &[],
                solutions: &[],
            },
            Self::AuthenticationFailed => &ErrorInfo {
                family: ErrorFamily::Authorization,
                code: 20151,
                name: "AuthenticationFailed",
                description: "Authentication Failed",
                explanation: "The Authentication with the provided JWT failed",
                causes: &[],
                solutions: &[],
            },
            Self::ExpirationTimeExceedsMaxTimeAllowed => &ErrorInfo {
                family: ErrorFamily::Authorization,
                code: 20157,
                name: "ExpirationTimeExceedsMaxTimeAllowed",
                description: "Expiration Time Exceeds Maximum Time Allowed",
                explanation: "The expiration time provided when creating the JWT exceeds the maximum duration allowed",
                causes: &[],
                solutions: &[],
            },
            Self::Forbidden => &ErrorInfo {
                family: ErrorFamily::Forbidden,
                code: 20403,
                name: "Forbidden",
                description: "403 Forbidden",
                explanation: "The account lacks permission to access the Twilio API. Typically this means the account has been suspended or closed. For assistance, please contact support",
                causes: &[],
                solutions: &[],
            },
            Self::InvalidApplicationSid => &ErrorInfo {
                family: ErrorFamily::TwiMl,
                code: 21218,
                name: "InvalidApplicationSid",
                description: "Invalid ApplicationSid",
                explanation: "You attempted to initiate an outbound phone call with an invalid ApplicationSid. The application may not exist anymore or may not be available within your account",
                causes: &[],
                solutions: &[],
            },
            Self::ConnectionError => &ErrorInfo {
                family: ErrorFamily::General,
                code: 31005,
                name: "ConnectionError",
                description: "Connection error",
                explanation: "A connection error occurred during the call",
                causes: &[],
                solutions: &[],
            },
            Self::CallCancelledError => &ErrorInfo {
                family: ErrorFamily::General,
                code: 31008,
                name: "CallCancelledError",
                description: "Call cancelled",
                explanation: "Unable to answer because the call has ended",
                causes: &[
                    "The incoming call was cancelled because it was not answered in time or it was accepted/rejected by another application instance registered with the same identity.",
                ],
                solutions: &[],
            },
            Self::TransportError => &ErrorInfo {
                family: ErrorFamily::General,
                code: 31009,
                name: "TransportError",
                description: "Transport error",
                explanation: "No transport available to send or receive messages",
                causes: &[],
                solutions: &[],
            },
            Self::MalformedRequestError => &ErrorInfo {
                family: ErrorFamily::MalformedRequest,
                code: 31100,
                name: "MalformedRequestError",
                description: "The request had malformed syntax.",
                explanation: "The request could not be understood due to malformed syntax.",
                causes: &[
                    "Invalid content or MessageType passed to sendMessage method.",
                ],
                solutions: &[
                    "Ensure content and MessageType passed to sendMessage method are valid.",
                ],
            },
            Self::AuthorizationError => &ErrorInfo {
                family: ErrorFamily::Authorization,
                code: 31201,
                name: "AuthorizationError",
                description: "Authorization error",
                explanation: "The request requires user authentication. The server understood the request, but is refusing to fulfill it.",
                causes: &[],
                solutions: &[],
            },
            Self::RateExceededError => &ErrorInfo {
                family: ErrorFamily::Authorization,
                code: 31206,
                name: "RateExceededError",
                description: "Rate exceeded authorized limit.",
                explanation: "The request performed exceeds the authorized limit.",
                causes: &[
                    "Rate limit exceeded.",
                ],
                solutions: &[
                    "Ensure message send rate does not exceed authorized limits.",
                ],
            },
            Self::CallMessageEventTypeInvalidError => &ErrorInfo {
                family: ErrorFamily::Authorization,
                code: 31210,
                name: "CallMessageEventTypeInvalidError",
                description: "Call Message Event Type is invalid.",
                explanation: "The Call Message Event Type is invalid and is not understood by Twilio Voice.",
                causes: &[
                    "The Call Message Event Type is invalid and is not understood by Twilio Voice.",
                ],
                solutions: &[
                    "Ensure the Call Message Event Type is Valid and understood by Twilio Voice and try again.",
                ],
            },
            Self::CallMessageUnexpectedStateError => &ErrorInfo {
                family: ErrorFamily::Authorization,
                code: 31211,
                name: "CallMessageUnexpectedStateError",
                description: "Call is not in the expected state.",
                explanation: "The Call should be at least in the ringing state to send Call Message.",
                causes: &[
                    "The Call should be at least in the ringing state to subscribe and send Call Message.",
                ],
                solutions: &[
                    "Ensure the Call is at least in the ringing state and the subscription is successful and try again.",
                ],
            },
            Self::PayloadSizeExceededError => &ErrorInfo {
                family: ErrorFamily::Authorization,
                code: 31212,
                name: "PayloadSizeExceededError",
                description: "Call Message Event Payload size exceeded authorized limit.",
                explanation: "The request performed to send a Call Message Event exceeds the payload size authorized limit",
                causes: &[
                    "The payload size of Call Message Event exceeds the authorized limit.",
                ],
                solutions: &[
                    "Reduce payload size of Call Message Event to be within the authorized limit and try again.",
                ],
            },
            Self::RegistrationError => &ErrorInfo {
                family: ErrorFamily::Registration,
                code: 31301,
                name: "RegistrationError",
                description: "Registration error",
                explanation: "",
                causes: &[],
                solutions: &[],
            },
            Self::UnsupportedCancelMessageError => &ErrorInfo {
                family: ErrorFamily::Registration,
                code: 31302,
                name: "UnsupportedCancelMessageError",
                description: "Unsupported Cancel Message Error",
                explanation: "This version of the SDK no longer supports processing cancel push notification messages. You must register via Voice.register(...) on Android or [TwilioVoice registerWithAccessToken:deviceToken:completion:] on iOS with this version of the SDK to stop receiving cancel push notification messages. Cancellations are now handled internally and reported to you on behalf of the SDK.",
                causes: &[
                    "The identity associated with the Twilio Voice SDK is still registered to receive cancel push notification messages.",
                ],
                solutions: &[
                    "The application must register via Voice.register(...) on Android or [TwilioVoice registerWithAccessToken:deviceToken:completion:] on iOS to stop receiving cancel push notification messages.",
                ],
            },
            Self::BadRequest => &ErrorInfo {
                family: ErrorFamily::Client,
                code: 31400,
                name: "BadRequest",
                description: "Bad Request (HTTP/SIP)",
                explanation: "The request could not be understood due to malformed syntax.",
                causes: &[],
                solutions: &[],
            },
            Self::PermissionDeniedError => &ErrorInfo {
                family: ErrorFamily::UserMedia,
                code: 31401,
                name: "PermissionDeniedError",
                description: "UserMedia Permission Denied Error",
                explanation: "The browser or end-user denied permissions to user media. Therefore we were unable to acquire input audio.",
                causes: &[
                    "The user denied the getUserMedia request.",
                    "The browser denied the getUserMedia request.",
                    "The application has not been configured with the proper permissions.",
                ],
                solutions: &[
                    "The user should accept the request next time prompted. If the browser saved the deny, the user should change that permission in their browser.",
                    "The user should to verify that the browser has permission to access the microphone at this address.",
                    "The user should ensure that the proper permissions have been granted in the mobile device OS.",
                ],
            },
            Self::ClientForbidden => &ErrorInfo {
                family: ErrorFamily::Client,
                code: 31403,
                name: "Forbidden",
                description: "Forbidden (HTTP/SIP)",
                explanation: "The server understood the request, but is refusing to fulfill it.",
                causes: &[],
                solutions: &[],
            },
            Self::NotFound => &ErrorInfo {
                family: ErrorFamily::Client,
                code: 31404,
                name: "NotFound",
                description: "Not Found (HTTP/SIP)",
                explanation: "The server has not found anything matching the request.",
                causes: &[
                    "The outbound call was made to an invalid phone number.",
                    "The TwiML application sid is missing a Voice URL.",
                ],
                solutions: &[
                    "Ensure the phone number dialed is valid.",
                    "Ensure the TwiML application is configured correctly with a Voice URL link.",
                ],
            },
            Self::RequestTimeout => &ErrorInfo {
                family: ErrorFamily::Client,
                code: 31408,
                name: "RequestTimeout",
                description: "Request Timeout (HTTP/SIP)",
                explanation: "A request timeout occurred.",
                causes: &[],
                solutions: &[],
            },
            Self::Conflict => &ErrorInfo {
                family: ErrorFamily::Client,
                code: 31409,
                name: "Conflict",
                description: "Conflict (HTTP)",
                explanation: "The request could not be processed because of a conflict in the current state of the resource. Another request may be in progress.",
                causes: &[],
                solutions: &[],
            },
            Self::UpgradeRequired => &ErrorInfo {
                family: ErrorFamily::Client,
                code: 31426,
                name: "UpgradeRequired",
                description: "Upgrade Required (HTTP)",
                explanation: "This error is raised when an HTTP 426 response is received. The reason for this is most likely because of an incompatible TLS version. To mitigate this, you may need to upgrade the OS or download a more recent version of the SDK.",
                causes: &[],
                solutions: &[],
            },
            Self::TooManyRequests => &ErrorInfo {
                family: ErrorFamily::Client,
                code: 31429,
                name: "TooManyRequests",
                description: "Too Many Requests (HTTP)",
                explanation: "Too many requests were sent in a given amount of time.",
                causes: &[],
                solutions: &[],
            },
            Self::TemporarilyUnavailable => &ErrorInfo {
                family: ErrorFamily::Client,
                code: 31480,
                name: "TemporarilyUnavailable",
                description: "Temporarily Unavailable (SIP)",
                explanation: "The callee is currently unavailable.",
                causes: &[],
                solutions: &[],
            },
            Self::CallTransactionDoesNotExist => &ErrorInfo {
                family: ErrorFamily::Client,
                code: 31481,
                name: "CallTransactionDoesNotExist",
                description: "Call/Transaction Does Not Exist (SIP)",
                explanation: "The call no longer exists.",
                causes: &[],
                solutions: &[],
            },
            Self::AddressIncomplete => &ErrorInfo {
                family: ErrorFamily::Client,
                code: 31484,
                name: "AddressIncomplete",
                description: "Address Incomplete (SIP)",
                explanation: "The provided phone number is malformed.",
                causes: &[
                    "The outbound call was made with a phone number that has an invalid format.",
                ],
                solutions: &[
                    "Ensure the phone number dialed is formatted correctly.",
                ],
            },
            Self::BusyHere => &ErrorInfo {
                family: ErrorFamily::Client,
                code: 31486,
                name: "BusyHere",
                description: "Busy Here (SIP)",
                explanation: "The callee is busy.",
                causes: &[],
                solutions: &[],
            },
            Self::RequestTerminated => &ErrorInfo {
                family: ErrorFamily::Client,
                code: 31487,
                name: "RequestTerminated",
                description: "Request Terminated (SIP)",
                explanation: "The request has terminated as a result of a bye or cancel.",
                causes: &[],
                solutions: &[],
            },
            Self::InternalServerError => &ErrorInfo {
                family: ErrorFamily::Server,
                code: 31500,
                name: "InternalServerError",
                description: "Internal Server Error (HTTP/SIP)",
                explanation: "The server could not fulfill the request due to some unexpected condition.",
                causes: &[],
                solutions: &[],
            },
            Self::BadGateway => &ErrorInfo {
                family: ErrorFamily::Server,
                code: 31502,
                name: "BadGateway",
                description: "Bad Gateway (HTTP/SIP)",
                explanation: "The server is acting as a gateway or proxy, and received an invalid response from a downstream server while attempting to fulfill the request.",
                causes: &[],
                solutions: &[],
            },
            Self::ServiceUnavailable => &ErrorInfo {
                family: ErrorFamily::Server,
                code: 31503,
                name: "ServiceUnavailable",
                description: "Service Unavailable (HTTP/SIP)",
                explanation: "The server is currently unable to handle the request due to a temporary overloading or maintenance of the server. This error can also be caused by the Application SID provided in the access token pointing to an inaccessible URL.",
                causes: &[],
                solutions: &[],
            },
            Self::GatewayTimeout => &ErrorInfo {
                family: ErrorFamily::Server,
                code: 31504,
                name: "GatewayTimeout",
                description: "Gateway Timeout (HTTP/SIP)",
                explanation: "The server, while acting as a gateway or proxy, did not receive a timely response from an upstream server.",
                causes: &[],
                solutions: &[],
            },
            Self::DnsResolutionError => &ErrorInfo {
                family: ErrorFamily::Server,
                code: 31530,
                name: "DNSResolutionError",
                description: "DNS Resolution Error (HTTP/SIP)",
                explanation: "Could not connect to the server.",
                causes: &[],
                solutions: &[],
            },
            Self::BusyEverywhere => &ErrorInfo {
                family: ErrorFamily::SipServer,
                code: 31600,
                name: "BusyEverywhere",
                description: "Busy Everywhere (SIP)",
                explanation: "All possible destinations are busy.",
                causes: &[],
                solutions: &[],
            },
            Self::Decline => &ErrorInfo {
                family: ErrorFamily::SipServer,
                code: 31603,
                name: "Decline",
                description: "Decline (SIP)",
                explanation: "The callee does not wish to participate in the call.",
                causes: &[],
                solutions: &[],
            },
            Self::DoesNotExistAnywhere => &ErrorInfo {
                family: ErrorFamily::SipServer,
                code: 31604,
                name: "DoesNotExistAnywhere",
                description: "Does Not Exist Anywhere (SIP)",
                explanation: "The requested callee does not exist anywhere.",
                causes: &[],
                solutions: &[],
            },
            Self::AccessTokenRejected => &ErrorInfo {
                family: ErrorFamily::Authorization,
                code: 51007,
                name: "AccessTokenRejected",
                description: "Token authentication is rejected by authentication service",
                explanation: "The authentication service has rejected the provided Access Token. To check whether the Access Token is structurally correct, you can use the tools available at https://jwt.io. For the details of Twilio's specific Access Token implementation including the grant format, check https://www.twilio.com/docs/iam/access-tokens.",
                causes: &[],
                solutions: &[],
            },
            Self::ConnectionDisconnected => &ErrorInfo {
                family: ErrorFamily::Signaling,
                code: 53001,
                name: "ConnectionDisconnected",
                description: "Signaling connection disconnected",
                explanation: "Raised whenever the signaling connection is unexpectedly disconnected.",
                causes: &[
                    "The device running your application lost its Internet connection.",
                ],
                solutions: &[
                    "Ensure the device running your application has access to a stable Internet connection.",
                ],
            },
            Self::ClientLocalDescFailed => &ErrorInfo {
                family: ErrorFamily::Media,
                code: 53400,
                name: "ClientLocalDescFailed",
                description: "Client is unable to create or apply a local media description",
                explanation: "Raised whenever a Client is unable to create or apply a local media description.",
                causes: &[
                    "The Client may not be using a supported WebRTC implementation.",
                    "The Client may not have the necessary resources to create or apply a new media description.",
                ],
                solutions: &[
                    "If you are experiencing this error using the JavaScript SDK, ensure you are running it with a supported WebRTC implementation.",
                ],
            },
            Self::ServerLocalDescFailed => &ErrorInfo {
                family: ErrorFamily::Media,
                code: 53401,
                name: "ServerLocalDescFailed",
                description: "Server is unable to create or apply a local media description",
                explanation: "Raised whenever the Server is unable to create or apply a local media description.",
                causes: &[
                    "A server-side error has occurred.",
                ],
                solutions: &[
                    "If the problem persists, try connecting to another region.",
                ],
            },
            Self::ClientRemoteDescFailed => &ErrorInfo {
                family: ErrorFamily::Media,
                code: 53402,
                name: "ClientRemoteDescFailed",
                description: "Client is unable to apply a remote media description",
                explanation: "Raised whenever the Client receives a remote media description but is unable to apply it.",
                causes: &[
                    "The Client may not be using a supported WebRTC implementation.",
                    "The Client may be connecting peer-to-peer with another Participant that is not using a supported WebRTC implementation.",
                    "The Client may not have the necessary resources to apply a new media description.",
                ],
                solutions: &[
                    "If you are experiencing this error using the JavaScript SDK, ensure you are running it with a supported WebRTC implementation.",
                ],
            },
            Self::ServerRemoteDescFailed => &ErrorInfo {
                family: ErrorFamily::Media,
                code: 53403,
                name: "ServerRemoteDescFailed",
                description: "Server is unable to apply a remote media description",
                explanation: "Raised whenever the Server receives a remote media description but is unable to apply it.",
                causes: &[
                    "The Client may not be using a supported WebRTC implementation.",
                    "The Client may not have the necessary resources to apply a new media description.",
                    "A Server-side error may have caused the Server to generate an invalid media description.",
                ],
                solutions: &[
                    "If you are experiencing this error using the JavaScript SDK, ensure you are running it with a supported WebRTC implementation.",
                    "If the problem persists, try connecting to another region.",
                ],
            },
            Self::NoSupportedCodec => &ErrorInfo {
                family: ErrorFamily::Media,
                code: 53404,
                name: "NoSupportedCodec",
                description: "No supported codec",
                explanation: "Raised whenever the intersection of codecs supported by the Client and the Server (or, in peer-to-peer, the Client and another Participant) is empty.",
                causes: &[
                    "The C++ SDK was built without the recommended set of codecs.",
                    "The JavaScript SDK is running in a browser that does not implement the recommended set of codecs.",
                ],
                solutions: &[
                    "If you are experiencing this error using the C++ SDK, ensure you build it with the recommended set of codecs.",
                    "If you are experiencing this error using the JavaScript SDK, ensure you are using a compatible browser.",
                ],
            },
            Self::MediaConnectionError => &ErrorInfo {
                family: ErrorFamily::Media,
                code: 53405,
                name: "ConnectionError",
                description: "Media connection failed",
                explanation: "Raised by the Client or Server whenever a media connection fails.",
                causes: &[
                    "The Client was unable to establish a media connection.",
                    "A media connection which was active failed liveliness checks.",
                ],
                solutions: &[
                    "If the problem persists, try connecting to another region.",
                    "Check your Client's network connectivity.",
                    "If you've provided custom ICE Servers then ensure that the URLs and credentials are valid.",
                ],
            },
            Self::MediaDtlsTransportFailedError => &ErrorInfo {
                family: ErrorFamily::Media,
                code: 53407,
                name: "MediaDtlsTransportFailedError",
                description: "The media connection failed due to DTLS handshake failure",
                explanation: "There was a problem while negotiating with the remote DTLS peer. Therefore the Client will not be able to establish the media connection.",
                causes: &[
                    "One or both of the DTLS peers have an invalid certificate.",
                    "One or both of the DTLS peers have an outdated version of DTLS.",
                    "One or both of the DTLS peers lost internet connectivity while performing a DTLS handshake.",
                ],
                solutions: &[
                    "Ensure that your certificate is valid.",
                    "Ensure that you have a stable internet connection.",
                    "Ensure that the browser or the Mobile SDK supports newer versions of DTLS.",
                ],
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_round_trips_through_its_code() {
        for kind in TwilioErrorKind::ALL {
            assert_eq!(TwilioErrorKind::from_code(kind.code()), Some(kind));
        }
    }

    #[test]
    fn unknown_code_has_no_kind() {
        assert_eq!(TwilioErrorKind::from_code(99999), None);
        assert_eq!(TwilioErrorKind::from_code(0), None);
    }

    #[test]
    fn shared_names_stay_distinct_by_code() {
        let general = TwilioErrorKind::from_code(31005).unwrap();
        let media = TwilioErrorKind::from_code(53405).unwrap();
        assert_eq!(general.name(), "ConnectionError");
        assert_eq!(media.name(), "ConnectionError");
        assert_ne!(general, media);
        assert_eq!(general.family(), ErrorFamily::General);
        assert_eq!(media.family(), ErrorFamily::Media);

        assert_eq!(TwilioErrorKind::from_code(20403), Some(TwilioErrorKind::Forbidden));
        assert_eq!(TwilioErrorKind::from_code(31403), Some(TwilioErrorKind::ClientForbidden));
    }

    #[test]
    fn metadata_matches_catalogue() {
        let info = TwilioErrorKind::AccessTokenInvalid.info();
        assert_eq!(info.description, "Invalid access token");
        assert_eq!(info.explanation, "Twilio was unable to validate your Access Token");
        assert!(info.causes.is_empty());

        let media = TwilioErrorKind::MediaConnectionError.info();
        assert_eq!(media.causes.len(), 2);
        assert_eq!(media.solutions.len(), 3);
    }
}
