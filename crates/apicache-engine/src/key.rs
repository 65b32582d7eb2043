//! # Key Deriver
//!
//! Builds cache keys of the form
//!
//! ```text
//! {prefix}:{namespace}:{function}[:{sha256(arguments)}]
//! ```
//!
//! The argument fingerprint covers every argument whose type is not in the
//! [`ExclusionPolicy`]. Injected per-request resources (connections,
//! request handles, the authenticated principal) are excluded so that the
//! same logical call always maps to the same key.
//!
//! Fingerprints are encoded exactly: internal `__` fields are kept and an
//! argument nested deeper than [`MAX_ARGUMENT_DEPTH`] is unkeyable.

use std::any::{TypeId, type_name};
use std::collections::{BTreeMap, HashMap};

use apicache_domain::{CacheKey, FunctionId, Namespace, ToValue, Value};
use sha2::{Digest, Sha256};

use crate::codec::{Codec, CodecOptions};
use crate::error::{CacheError, Result};

/// Deepest nesting of a single argument value that can be fingerprinted.
pub const MAX_ARGUMENT_DEPTH: usize = 64;

// argument values sit inside `[[positional...], {keyword...}]`
const FINGERPRINT_WRAPPING: usize = 2;

/// Argument types that never contribute to a cache key.
#[derive(Debug, Clone, Default)]
pub struct ExclusionPolicy {
    types: HashMap<TypeId, &'static str>,
}

impl ExclusionPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn exclude<T: ?Sized + 'static>(mut self) -> Self {
        self.insert::<T>();
        self
    }

    pub fn insert<T: ?Sized + 'static>(&mut self) {
        self.types.insert(TypeId::of::<T>(), type_name::<T>());
    }

    pub fn is_excluded(&self, type_id: TypeId) -> bool {
        self.types.contains_key(&type_id)
    }

    pub fn type_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.types.values().copied()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

// =============================================================================
// CALL ARGUMENTS
// =============================================================================

#[derive(Debug, Clone)]
struct CallArg {
    type_id: TypeId,
    type_name: &'static str,
    /// `None` for injected resources that have no value representation.
    value: Option<Value>,
}

impl CallArg {
    fn value<T: ToValue + ?Sized + 'static>(value: &T) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            value: Some(value.to_value()),
        }
    }

    fn resource<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            value: None,
        }
    }
}

/// Arguments of one call, as seen by the key deriver.
///
/// Keyword arguments are kept sorted by name, so the order they are added
/// in does not affect the key.
#[derive(Debug, Clone, Default)]
pub struct CallArgs {
    positional: Vec<CallArg>,
    keyword: BTreeMap<String, CallArg>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn arg<T: ToValue + ?Sized + 'static>(mut self, value: &T) -> Self {
        self.positional.push(CallArg::value(value));
        self
    }

    #[must_use]
    pub fn kwarg<T: ToValue + ?Sized + 'static>(mut self, name: impl Into<String>, value: &T) -> Self {
        self.keyword.insert(name.into(), CallArg::value(value));
        self
    }

    /// Record an injected resource; only its type is inspected.
    #[must_use]
    pub fn resource<T: ?Sized + 'static>(mut self, _resource: &T) -> Self {
        self.positional.push(CallArg::resource::<T>());
        self
    }

    #[must_use]
    pub fn kw_resource<T: ?Sized + 'static>(mut self, name: impl Into<String>, _resource: &T) -> Self {
        self.keyword.insert(name.into(), CallArg::resource::<T>());
        self
    }

    pub fn len(&self) -> usize {
        self.positional.len() + self.keyword.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Argument bundles that can describe themselves for key derivation.
pub trait CacheArgs {
    fn call_args(&self) -> CallArgs;
}

impl CacheArgs for CallArgs {
    fn call_args(&self) -> CallArgs {
        self.clone()
    }
}

impl CacheArgs for () {
    fn call_args(&self) -> CallArgs {
        CallArgs::new()
    }
}

// =============================================================================
// KEY DERIVER
// =============================================================================

/// Derives deterministic cache keys.
#[derive(Debug, Clone)]
pub struct KeyDeriver {
    prefix: String,
    exclusions: ExclusionPolicy,
    codec: Codec,
}

impl KeyDeriver {
    /// Fingerprints use `codec`'s registry with storage filtering off.
    pub fn new(prefix: String, exclusions: ExclusionPolicy, codec: &Codec) -> Self {
        let codec = codec.with_options(CodecOptions {
            max_depth: MAX_ARGUMENT_DEPTH + FINGERPRINT_WRAPPING,
            storage_safe: false,
            ..codec.options().clone()
        });
        Self {
            prefix,
            exclusions,
            codec,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub const fn exclusions(&self) -> &ExclusionPolicy {
        &self.exclusions
    }

    /// Prefix of every key under `namespace`.
    pub fn namespace_prefix(&self, namespace: &Namespace) -> String {
        namespace.key_prefix(&self.prefix)
    }

    pub fn derive(
        &self,
        namespace: &Namespace,
        function: &FunctionId,
        args: &CallArgs,
    ) -> Result<CacheKey> {
        let mut key = self.namespace_prefix(namespace);
        key.push_str(function.as_str());

        if let Some(fingerprint) = self.fingerprint(args)? {
            key.push(':');
            key.push_str(&fingerprint);
        }
        Ok(CacheKey::new(key))
    }

    /// SHA-256 of the included arguments, `None` when nothing is included.
    pub fn fingerprint(&self, args: &CallArgs) -> Result<Option<String>> {
        let positional = args
            .positional
            .iter()
            .filter_map(|arg| self.included(arg).transpose())
            .collect::<Result<Vec<_>>>()?;
        let keyword = args
            .keyword
            .iter()
            .filter_map(|(name, arg)| {
                self.included(arg)
                    .transpose()
                    .map(|v| v.map(|v| (name.clone(), v)))
            })
            .collect::<Result<BTreeMap<_, _>>>()?;

        if positional.is_empty() && keyword.is_empty() {
            return Ok(None);
        }

        let text = self
            .codec
            .encode_exact(&Value::List(vec![Value::List(positional), Value::Map(keyword)]))?;
        let digest = Sha256::digest(text.as_bytes());
        Ok(Some(hex::encode(digest)))
    }

    fn included(&self, arg: &CallArg) -> Result<Option<Value>> {
        if self.exclusions.is_excluded(arg.type_id) {
            return Ok(None);
        }
        match &arg.value {
            Some(value) if !nested_deeper_than(value, MAX_ARGUMENT_DEPTH) => {
                Ok(Some(value.clone()))
            }
            _ => Err(CacheError::UnkeyableArgument {
                type_name: arg.type_name,
            }),
        }
    }
}

fn nested_deeper_than(value: &Value, levels: usize) -> bool {
    if levels == 0 {
        return true;
    }
    match value {
        Value::List(items) => items.iter().any(|v| nested_deeper_than(v, levels - 1)),
        Value::Map(map) => map.values().any(|v| nested_deeper_than(v, levels - 1)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apicache_domain::function_id;
    use fake::Fake;
    use fake::faker::internet::en::SafeEmail;
    use std::collections::HashSet;

    /// Stands in for an injected database session.
    struct DbSession {
        _conn_id: u32,
    }

    #[derive(Debug, Clone)]
    struct CurrentUser {
        id: i64,
    }

    impl ToValue for CurrentUser {
        fn to_value(&self) -> Value {
            Value::record().field("id", &self.id).build()
        }
    }

    fn deriver() -> KeyDeriver {
        KeyDeriver::new(
            "api-cache".to_string(),
            ExclusionPolicy::new()
                .exclude::<DbSession>()
                .exclude::<CurrentUser>(),
            &Codec::default(),
        )
    }

    fn users() -> Namespace {
        Namespace::new("users").unwrap()
    }

    #[test]
    fn test_excluded_arguments_do_not_affect_key() {
        let f = function_id!(read_user_by_id);
        let a = CallArgs::new()
            .resource(&DbSession { _conn_id: 1 })
            .kwarg("user_id", &7_i64)
            .kwarg("current_user", &CurrentUser { id: 1 });
        let b = CallArgs::new()
            .resource(&DbSession { _conn_id: 99 })
            .kwarg("user_id", &7_i64)
            .kwarg("current_user", &CurrentUser { id: 2 });

        let d = deriver();
        assert_eq!(
            d.derive(&users(), &f, &a).unwrap(),
            d.derive(&users(), &f, &b).unwrap()
        );
    }

    #[test]
    fn test_included_arguments_change_key() {
        let f = function_id!(read_user_by_id);
        let d = deriver();
        let k7 = d
            .derive(&users(), &f, &CallArgs::new().kwarg("user_id", &7_i64))
            .unwrap();
        let k8 = d
            .derive(&users(), &f, &CallArgs::new().kwarg("user_id", &8_i64))
            .unwrap();
        assert_ne!(k7, k8);
    }

    #[test]
    fn test_generated_arguments_do_not_collide() {
        let f = function_id!(find_by_email);
        let d = deriver();
        let mut emails = HashSet::new();
        let mut keys = HashSet::new();
        for _ in 0..200 {
            let email: String = SafeEmail().fake();
            let key = d
                .derive(&users(), &f, &CallArgs::new().kwarg("email", &email))
                .unwrap();
            emails.insert(email);
            keys.insert(key);
        }
        assert_eq!(keys.len(), emails.len());
    }

    #[test]
    fn test_keyword_order_is_irrelevant() {
        let f = function_id!(read_users);
        let d = deriver();
        let a = CallArgs::new().kwarg("skip", &0_i64).kwarg("limit", &100_i64);
        let b = CallArgs::new().kwarg("limit", &100_i64).kwarg("skip", &0_i64);
        assert_eq!(
            d.derive(&users(), &f, &a).unwrap(),
            d.derive(&users(), &f, &b).unwrap()
        );
    }

    #[test]
    fn test_positional_and_keyword_are_distinguished() {
        let f = function_id!(read_users);
        let d = deriver();
        let positional = CallArgs::new().arg(&5_i64);
        let keyword = CallArgs::new().kwarg("0", &5_i64);
        assert_ne!(
            d.derive(&users(), &f, &positional).unwrap(),
            d.derive(&users(), &f, &keyword).unwrap()
        );
    }

    #[test]
    fn test_only_excluded_arguments_degrade_to_function_key() {
        let f = FunctionId::from_static("app::users::read_me");
        let args = CallArgs::new()
            .resource(&DbSession { _conn_id: 3 })
            .kwarg("current_user", &CurrentUser { id: 4 });

        let key = deriver().derive(&users(), &f, &args).unwrap();
        assert_eq!(key.as_str(), "api-cache:users:app::users::read_me");
    }

    #[test]
    fn test_fingerprint_shape() {
        let f = FunctionId::from_static("app::users::read_user_by_id");
        let key = deriver()
            .derive(&users(), &f, &CallArgs::new().kwarg("user_id", &7_i64))
            .unwrap();

        let fingerprint = key
            .as_str()
            .strip_prefix("api-cache:users:app::users::read_user_by_id:")
            .unwrap();
        assert_eq!(fingerprint.len(), 64);
        assert!(fingerprint.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(key.belongs_to(&users(), "api-cache"));
    }

    #[test]
    fn test_unexcluded_resource_is_rejected() {
        struct Mailer;
        let f = function_id!(send_digest);
        let err = deriver()
            .derive(&users(), &f, &CallArgs::new().resource(&Mailer))
            .unwrap_err();
        assert!(matches!(err, CacheError::UnkeyableArgument { .. }));
    }

    #[test]
    fn test_str_and_string_arguments_fingerprint_alike() {
        let f = function_id!(search);
        let d = deriver();
        let owned = String::from("ada");
        assert_eq!(
            d.derive(&users(), &f, &CallArgs::new().arg(&owned)).unwrap(),
            d.derive(&users(), &f, &CallArgs::new().arg("ada")).unwrap()
        );
    }

    #[test]
    fn test_internal_map_keys_change_key() {
        let f = function_id!(search);
        let d = deriver();
        let page = |n: i64| HashMap::from([("__page".to_string(), n)]);
        assert_ne!(
            d.derive(&users(), &f, &CallArgs::new().arg(&page(1))).unwrap(),
            d.derive(&users(), &f, &CallArgs::new().arg(&page(2))).unwrap()
        );
    }

    #[test]
    fn test_deeply_nested_arguments_change_key() {
        let f = function_id!(search);
        let d = deriver();
        let nested =
            |leaf: i64| (0..8).fold(Value::Int(leaf), |inner, _| Value::List(vec![inner]));
        assert_ne!(
            d.derive(&users(), &f, &CallArgs::new().arg(&nested(1))).unwrap(),
            d.derive(&users(), &f, &CallArgs::new().arg(&nested(2))).unwrap()
        );

        let deepest =
            (1..MAX_ARGUMENT_DEPTH).fold(Value::Int(1), |inner, _| Value::List(vec![inner]));
        assert!(d.derive(&users(), &f, &CallArgs::new().arg(&deepest)).is_ok());
    }

    #[test]
    fn test_argument_past_depth_limit_is_unkeyable() {
        let f = function_id!(search);
        let too_deep =
            (0..MAX_ARGUMENT_DEPTH).fold(Value::Int(1), |inner, _| Value::List(vec![inner]));
        let err = deriver()
            .derive(&users(), &f, &CallArgs::new().kwarg("filter", &too_deep))
            .unwrap_err();
        assert!(matches!(err, CacheError::UnkeyableArgument { .. }));
    }
}
