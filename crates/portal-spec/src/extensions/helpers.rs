//! Handlebars adapters for the extension functions.

use handlebars::{
    Context, Handlebars, Helper, HelperDef, RenderContext, RenderError, RenderErrorReason,
    ScopedJson,
};
use serde_json::{Value, json};

use crate::extensions::{
    ExtensionConfig, generate_password, generate_ssh_keypair, hash_password, netmask, subnet,
};

pub const SUBNET: &str = "subnet";
pub const NETMASK: &str = "netmask";
pub const GENERATE_PASSWORD: &str = "generate_password";
pub const HASH_PASSWORD: &str = "hash_password";
pub const GENERATE_SSH_KEYPAIR: &str = "generate_ssh_keypair";

/// Names of every helper installed by [`register_extensions`].
pub const EXTENSION_HELPERS: [&str; 5] = [
    SUBNET,
    NETMASK,
    GENERATE_PASSWORD,
    HASH_PASSWORD,
    GENERATE_SSH_KEYPAIR,
];

/// Installs the extension helpers on a registry.
pub fn register_extensions(registry: &mut Handlebars<'_>, config: &ExtensionConfig) {
    registry.register_helper(SUBNET, Box::new(SubnetHelper));
    registry.register_helper(NETMASK, Box::new(NetmaskHelper));
    registry.register_helper(GENERATE_PASSWORD, Box::new(GeneratePasswordHelper));
    registry.register_helper(
        HASH_PASSWORD,
        Box::new(HashPasswordHelper {
            rounds: config.hash_rounds,
        }),
    );
    registry.register_helper(
        GENERATE_SSH_KEYPAIR,
        Box::new(SshKeypairHelper {
            comment: config.ssh_key_comment.clone(),
        }),
    );
}

struct SubnetHelper;

impl HelperDef for SubnetHelper {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'rc>, RenderError> {
        let net = text_param(h, SUBNET, 0)?;
        let index = param(h, SUBNET, 1)?;
        Ok(ScopedJson::Derived(Value::String(subnet(&net, index))))
    }
}

struct NetmaskHelper;

impl HelperDef for NetmaskHelper {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'rc>, RenderError> {
        let net = text_param(h, NETMASK, 0)?;
        Ok(ScopedJson::Derived(Value::String(netmask(&net))))
    }
}

struct GeneratePasswordHelper;

impl HelperDef for GeneratePasswordHelper {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'rc>, RenderError> {
        let raw = param(h, GENERATE_PASSWORD, 0)?;
        let length = match raw {
            Value::Number(number) => number.as_u64(),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        }
        .and_then(|length| usize::try_from(length).ok())
        .ok_or_else(|| {
            RenderErrorReason::Other(format!(
                "{GENERATE_PASSWORD}: length must be a non-negative integer, got {raw}"
            ))
        })?;
        Ok(ScopedJson::Derived(Value::String(generate_password(length))))
    }
}

struct HashPasswordHelper {
    rounds: u32,
}

impl HelperDef for HashPasswordHelper {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'rc>, RenderError> {
        let password = text_param(h, HASH_PASSWORD, 0)?;
        Ok(ScopedJson::Derived(Value::String(hash_password(
            &password,
            self.rounds,
        ))))
    }
}

struct SshKeypairHelper {
    comment: Option<String>,
}

impl HelperDef for SshKeypairHelper {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        _: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'rc>, RenderError> {
        let pair = generate_ssh_keypair(self.comment.as_deref())
            .map_err(|err| RenderErrorReason::Other(err.to_string()))?;
        Ok(ScopedJson::Derived(json!([pair.private_key, pair.public_key])))
    }
}

fn param<'a>(h: &'a Helper<'_>, helper: &'static str, index: usize) -> Result<&'a Value, RenderError> {
    h.param(index)
        .map(|param| param.value())
        .ok_or_else(|| RenderErrorReason::ParamNotFoundForIndex(helper, index).into())
}

fn text_param(h: &Helper<'_>, helper: &'static str, index: usize) -> Result<String, RenderError> {
    Ok(match param(h, helper, index)? {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    })
}
