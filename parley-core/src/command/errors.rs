use std::fmt::Display;
use std::time::Duration;

/// A problem with a command, group, argument or type definition. These are programming errors in
/// the definitions, so they are raised at registration time and never recovered from.
#[derive(Debug, Clone, PartialEq)]
pub enum RegistrationError {
    /// A required field was missing or malformed.
    InvalidInfo(String),
    /// A command name or alias collides with an already registered name or alias.
    DuplicateName(String),
    /// The member name is already taken within the group.
    DuplicateMemberName { member_name: String, group: String },
    DuplicateGroup(String),
    DuplicateType(String),
    /// Only one command may handle unresolved invocations.
    DuplicateUnknownCommand(String),
    UnknownGroup(String),
    UnknownType(String),
    UnknownCommand(String),
    InvalidThrottling(String),
    InvalidPattern(String),
    /// Arguments declared in an order the collector cannot honour.
    ArgumentOrder(String),
    /// A replacement command changed a field that identifies it.
    ImmutableField(&'static str),
    Guarded(String),
}

impl Display for RegistrationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInfo(message) => write!(f, "invalid definition: {message}"),
            Self::DuplicateName(name) => write!(f, "a command with the name/alias \"{name}\" is already registered"),
            Self::DuplicateMemberName { member_name, group } => write!(
                f,
                "a command with the member name \"{member_name}\" is already registered in {group}"
            ),
            Self::DuplicateGroup(id) => write!(f, "a group with the ID \"{id}\" is already registered"),
            Self::DuplicateType(id) => write!(f, "an argument type with the ID \"{id}\" is already registered"),
            Self::DuplicateUnknownCommand(name) => write!(f, "an unknown command is already registered ({name})"),
            Self::UnknownGroup(id) => write!(f, "group \"{id}\" is not registered"),
            Self::UnknownType(id) => write!(f, "argument type \"{id}\" isn't registered"),
            Self::UnknownCommand(name) => write!(f, "command \"{name}\" is not registered"),
            Self::InvalidThrottling(message) => write!(f, "invalid throttling: {message}"),
            Self::InvalidPattern(message) => write!(f, "invalid pattern: {message}"),
            Self::ArgumentOrder(message) => f.write_str(message),
            Self::ImmutableField(field) => write!(f, "command {field} cannot change"),
            Self::Guarded(name) => write!(f, "{name} is guarded"),
        }
    }
}
impl std::error::Error for RegistrationError {}

/// An error whose message is safe to show to users as-is.
///
/// Returning this from a command makes the dispatcher reply with the message verbatim instead of
/// the generic failure notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FriendlyError(pub String);

impl FriendlyError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
impl Display for FriendlyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
impl std::error::Error for FriendlyError {}

/// Why a dispatch did not reach the command body.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockReason {
    GuildOnly,
    Nsfw,
    /// Carries a specific explanation when the permission check produced one.
    Permission { response: Option<String> },
    ClientPermissions { missing: Vec<String> },
    Throttling { remaining: Duration },
    /// Vetoed by an inhibitor.
    Inhibited(String),
}

impl BlockReason {
    pub fn reason(&self) -> &str {
        match self {
            Self::GuildOnly => "guildOnly",
            Self::Nsfw => "nsfw",
            Self::Permission { .. } => "permission",
            Self::ClientPermissions { .. } => "clientPermissions",
            Self::Throttling { .. } => "throttling",
            Self::Inhibited(reason) => reason,
        }
    }
}
impl Display for BlockReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Throttling { remaining } => write!(f, "throttling ({:.1}s remaining)", remaining.as_secs_f64()),
            Self::ClientPermissions { missing } => write!(f, "clientPermissions ({})", missing.join(", ")),
            other => f.write_str(other.reason()),
        }
    }
}
