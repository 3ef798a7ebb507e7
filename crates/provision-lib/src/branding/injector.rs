//! Branding injection
//!
//! Produces the MOTD banner, the full branding script, a one-line
//! equivalent and the inverse cleanup script for a rented node.

use serde_json::json;

use crate::models::{BrandingContext, BrandingProfile};
use crate::script::{neutralize, ShellScript, Step, Word};

/// System-wide login banner
pub const MOTD_PATH: &str = "/etc/motd";

/// Profile used when `$HOME` is unset
const PROFILE_FALLBACK: &str = "\"${HOME:-/root}/.bashrc\"";

const MOTD_TEMPLATE: &str = "\
============================================================
  {{BANNER}}
============================================================

  Instance ID : {{INSTANCE_ID}}
  Region      : {{REGION}}
  Plan        : {{PLAN}}
  Expires     : {{EXPIRES_AT}}

  Run 'instance-info' to view instance metadata.
============================================================";

/// Generates branding artifacts for one operator profile
#[derive(Debug, Clone, Default)]
pub struct BrandingInjector {
    profile: BrandingProfile,
}

impl BrandingInjector {
    pub fn new(profile: BrandingProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &BrandingProfile {
        &self.profile
    }

    /// Directory holding the instance metadata
    pub fn metadata_dir(&self) -> String {
        format!("/etc/{}", safe_token(&self.profile.slug, "provider"))
    }

    pub fn metadata_path(&self) -> String {
        format!("{}/instance.json", self.metadata_dir())
    }

    /// Unique line opening the appended profile block
    pub fn profile_marker(&self) -> String {
        format!("# >>> {} branding >>>", safe_token(&self.profile.slug, "provider"))
    }

    /// Line closing the appended profile block
    pub fn profile_end_marker(&self) -> String {
        format!("# <<< {} branding <<<", safe_token(&self.profile.slug, "provider"))
    }

    /// Fill the banner template; each placeholder is replaced exactly once
    pub fn motd(&self, ctx: &BrandingContext) -> String {
        let values = [
            ("BANNER", neutralize(&self.profile.banner)),
            ("INSTANCE_ID", neutralize(&ctx.instance_id)),
            ("REGION", neutralize(&ctx.region)),
            ("PLAN", neutralize(&ctx.plan)),
            ("EXPIRES_AT", neutralize(&ctx.expires_at)),
        ];
        fill_template(MOTD_TEMPLATE, &values)
    }

    /// Machine-readable instance metadata
    pub fn metadata_json(&self, ctx: &BrandingContext) -> String {
        let metadata = json!({
            "provider": self.profile.provider,
            "instance_id": ctx.instance_id,
            "region": ctx.region,
            "plan": ctx.plan,
            "expires_at": ctx.expires_at,
            "support": self.profile.support,
            "docs": self.profile.docs,
        });
        format!("{:#}", metadata)
    }

    /// Branded `PS1` export
    pub fn prompt_line(&self, ctx: &BrandingContext) -> String {
        let slug = safe_token(&self.profile.slug, "provider");
        let user = prompt_token(&ctx.username, "user");
        let instance = prompt_token(&ctx.instance_id, "instance");
        format!(
            "export PS1='\\[\\e[1;36m\\][{}]\\[\\e[0m\\] \\[\\e[1;32m\\]{}@{}\\[\\e[0m\\]:\\w\\$ '",
            slug, user, instance
        )
    }

    /// Lines appended to the user's profile between the markers
    pub fn profile_block(&self, ctx: &BrandingContext) -> Vec<String> {
        vec![
            self.prompt_line(ctx),
            format!("alias instance-info='cat {}'", self.metadata_path()),
            "alias gpu-status='nvidia-smi'".to_string(),
        ]
    }

    /// Full idempotent branding procedure as a typed script
    pub fn branding_steps(&self, ctx: &BrandingContext) -> ShellScript {
        let mut script = ShellScript::new().exit_on_error();
        script
            .push(Step::comment(format!(
                "{} branding for instance {}",
                self.profile.provider, ctx.instance_id
            )))
            .push(Step::run(["mkdir", "-p", self.metadata_dir().as_str()]))
            .push(Step::write_file(
                Word::lit(self.metadata_path()),
                self.metadata_json(ctx),
            ))
            .push(Step::write_file(Word::lit(MOTD_PATH), self.motd(ctx)))
            .extend(self.profile_steps(ctx))
            .push(Step::best_effort([
                Word::lit("hostname"),
                Word::lit(self.hostname(ctx)),
            ]));
        script
    }

    /// Directory, metadata and prompt only, for the one-line form
    pub fn oneliner_steps(&self, ctx: &BrandingContext) -> ShellScript {
        let mut script = ShellScript::new();
        script
            .push(Step::run(["mkdir", "-p", self.metadata_dir().as_str()]))
            .push(Step::write_file(
                Word::lit(self.metadata_path()),
                self.metadata_json(ctx),
            ))
            .extend(self.prompt_profile_steps(ctx));
        script
    }

    /// Inverse of the branding script; tolerates missing files
    pub fn cleanup_steps(&self) -> ShellScript {
        let mut script = ShellScript::new();
        script
            .push(Step::comment(format!("Remove {} branding", self.profile.provider)))
            .push(Step::run(["rm", "-rf", self.metadata_dir().as_str()]))
            .extend(self.profile_cleanup_steps())
            .push(Step::best_effort([
                Word::lit("printf"),
                Word::lit(""),
                Word::raw(">"),
                Word::lit(MOTD_PATH),
            ]));
        script
    }

    pub fn branding_script(&self, ctx: &BrandingContext) -> String {
        self.branding_steps(ctx).render()
    }

    pub fn branding_oneliner(&self, ctx: &BrandingContext) -> String {
        self.oneliner_steps(ctx).render_oneliner()
    }

    pub fn cleanup_script(&self) -> String {
        self.cleanup_steps().render()
    }

    /// Host name set on the node, a valid DNS label
    pub fn hostname(&self, ctx: &BrandingContext) -> String {
        let slug = safe_token(&self.profile.slug, "provider");
        let instance = safe_token(&ctx.instance_id, "node");
        let mut label = format!("{}-{}", slug, instance);
        label.truncate(63);
        label.trim_end_matches('-').to_string()
    }

    /// Resolve the profile file, create it if needed and append the marked block
    pub fn profile_steps(&self, ctx: &BrandingContext) -> Vec<Step> {
        self.marked_profile_steps(self.profile_block(ctx))
    }

    /// Like [`Self::profile_steps`] with the prompt as the only block line
    pub fn prompt_profile_steps(&self, ctx: &BrandingContext) -> Vec<Step> {
        self.marked_profile_steps(vec![self.prompt_line(ctx)])
    }

    fn marked_profile_steps(&self, mut block: Vec<String>) -> Vec<Step> {
        block.push(self.profile_end_marker());
        vec![
            profile_assignment(),
            Step::run([Word::lit("touch"), Word::Var("PROFILE")]),
            Step::AppendIfAbsent {
                path: Word::Var("PROFILE"),
                marker: self.profile_marker(),
                block,
            },
        ]
    }

    /// Delete every line from the opening marker through the closing one
    pub fn profile_cleanup_steps(&self) -> Vec<Step> {
        vec![
            profile_assignment(),
            Step::best_effort([
                Word::lit("sed"),
                Word::lit("-i"),
                Word::lit(format!(
                    "/^{}$/,/^{}$/d",
                    self.profile_marker(),
                    self.profile_end_marker()
                )),
                Word::Var("PROFILE"),
            ]),
        ]
    }
}

fn profile_assignment() -> Step {
    Step::Assign {
        name: "PROFILE",
        value: Word::raw(PROFILE_FALLBACK),
    }
}

/// Replace `{{KEY}}` placeholders in one pass; values are never rescanned
fn fill_template(template: &str, values: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(template.len() + 64);
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let key = &after[..end];
                match values.iter().find(|(k, _)| *k == key) {
                    Some((_, value)) => out.push_str(value),
                    None => out.push_str(&rest[start..start + 2 + end + 2]),
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Lowercase alphanumerics joined by single hyphens
fn safe_token(value: &str, fallback: &str) -> String {
    let token = value
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
        .to_ascii_lowercase();
    if token.is_empty() {
        fallback.to_string()
    } else {
        token
    }
}

/// Characters that survive both single quoting and prompt expansion
fn prompt_token(value: &str, fallback: &str) -> String {
    let token: String = value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();
    if token.is_empty() {
        fallback.to_string()
    } else {
        token
    }
}

/// Login banner for `ctx` using the default profile
pub fn generate_motd(ctx: &BrandingContext) -> String {
    BrandingInjector::default().motd(ctx)
}

/// Full branding script for `ctx` using the default profile
pub fn generate_branding_script(ctx: &BrandingContext) -> String {
    BrandingInjector::default().branding_script(ctx)
}

/// One-line branding command for `ctx` using the default profile
pub fn generate_branding_oneliner(ctx: &BrandingContext) -> String {
    BrandingInjector::default().branding_oneliner(ctx)
}

/// Cleanup script for the default profile
pub fn generate_cleanup_script() -> String {
    BrandingInjector::default().cleanup_script()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> BrandingContext {
        BrandingContext {
            instance_id: "inst-7f3a".to_string(),
            region: "eu-west-1".to_string(),
            plan: "A100 x2".to_string(),
            expires_at: "2026-11-01T00:00:00Z".to_string(),
            username: "alice".to_string(),
        }
    }

    #[test]
    fn test_motd_replaces_every_placeholder() {
        let motd = generate_motd(&ctx());
        assert!(!motd.contains("{{"));
        assert!(!motd.contains("}}"));
        assert!(motd.contains("Welcome to NodeRent GPU Cloud"));
        assert!(motd.contains("Instance ID : inst-7f3a"));
        assert!(motd.contains("Region      : eu-west-1"));
        assert!(motd.contains("Plan        : A100 x2"));
        assert!(motd.contains("Expires     : 2026-11-01T00:00:00Z"));
        assert_eq!(motd.matches("inst-7f3a").count(), 1);
    }

    #[test]
    fn test_motd_values_are_not_rescanned() {
        let mut c = ctx();
        c.region = "{{PLAN}}".to_string();
        c.plan = "gold\nInjected: yes".to_string();
        let motd = generate_motd(&c);
        assert!(motd.contains("Region      : {{PLAN}}"));
        assert!(motd.contains("Plan        : gold Injected: yes"));
    }

    #[test]
    fn test_fill_template_leaves_unknown_keys() {
        let out = fill_template("a {{X}} b {{Y}} c {{", &[("X", "1".to_string())]);
        assert_eq!(out, "a 1 b {{Y}} c {{");
    }

    #[test]
    fn test_metadata_json_keys() {
        let injector = BrandingInjector::default();
        let json: serde_json::Value =
            serde_json::from_str(&injector.metadata_json(&ctx())).unwrap();
        for key in ["provider", "instance_id", "region", "plan", "expires_at", "support", "docs"] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
        assert_eq!(json["provider"], "NodeRent");
        assert_eq!(json["plan"], "A100 x2");
    }

    #[test]
    fn test_branding_script_steps() {
        let script = generate_branding_script(&ctx());

        assert!(script.starts_with("#!/bin/sh\nset -e\n"));
        assert!(script.contains("mkdir -p /etc/noderent\n"));
        assert!(script.contains("cat > /etc/noderent/instance.json <<'__PROVISION_EOF__'"));
        assert!(script.contains("cat > /etc/motd <<'__PROVISION_EOF__'"));
        assert!(script.contains("PROFILE=\"${HOME:-/root}/.bashrc\"\n"));
        assert!(script.contains("touch \"$PROFILE\"\n"));
        assert!(script.contains(
            "if ! grep -qF '# >>> noderent branding >>>' \"$PROFILE\" 2>/dev/null; then"
        ));
        assert!(script.contains("alias instance-info='cat /etc/noderent/instance.json'"));
        assert!(script.contains("alias gpu-status='nvidia-smi'"));
        assert!(script.contains("hostname noderent-inst-7f3a || true\n"));
    }

    #[test]
    fn test_marker_appended_once_in_script() {
        let script = generate_branding_script(&ctx());
        // Once in the grep guard, once as the first appended line
        assert_eq!(script.matches("# >>> noderent branding >>>").count(), 2);
    }

    #[test]
    fn test_hostile_values_are_neutralized() {
        let mut c = ctx();
        c.username = "x'; rm -rf / #".to_string();
        c.instance_id = "$(reboot)\n__PROVISION_EOF__".to_string();
        let injector = BrandingInjector::default();
        let script = injector.branding_script(&c);

        // Prompt keeps only inert characters
        assert!(script.contains("xrm-rf@reboot__PROVISION_EOF__"));
        // No raw newline from a value can end a heredoc early
        assert!(!script.contains("\n__PROVISION_EOF__\n__PROVISION_EOF__"));
        assert_eq!(injector.hostname(&c), "noderent-reboot-provision-eof");
    }

    #[test]
    fn test_oneliner_subset() {
        let line = generate_branding_oneliner(&ctx());
        assert!(!line.contains('\n'));
        assert!(line.starts_with("mkdir -p /etc/noderent && printf '%s\\n' "));
        assert!(line.contains("> /etc/noderent/instance.json && "));
        assert!(line.contains("{ grep -qF '# >>> noderent branding >>>' \"$PROFILE\" 2>/dev/null || { if "));
        assert!(line.contains("export PS1="));
        assert!(line.contains("'# <<< noderent branding <<<'"));
        assert!(!line.contains("alias"));
        assert!(!line.contains("/etc/motd"));
        assert!(!line.contains("hostname"));
        assert!(!line.contains(" ; "));
    }

    #[test]
    fn test_cleanup_script() {
        let script = generate_cleanup_script();
        assert!(script.contains("rm -rf /etc/noderent\n"));
        assert!(script.contains(
            "sed -i '/^# >>> noderent branding >>>$/,/^# <<< noderent branding <<<$/d' \"$PROFILE\" || true"
        ));
        assert!(script.contains("printf '' > /etc/motd || true"));
        assert!(!script.contains("set -e"));
    }

    #[test]
    fn test_block_is_closed_by_end_marker() {
        let injector = BrandingInjector::default();
        let script = injector.branding_script(&ctx());
        assert!(script.contains("alias gpu-status='nvidia-smi'\n# <<< noderent branding <<<\n"));
        assert!(injector
            .cleanup_script()
            .contains(&format!("/^{}$/d", injector.profile_end_marker())));
    }

    #[test]
    fn test_custom_profile() {
        let injector = BrandingInjector::new(BrandingProfile {
            provider: "Acme Compute".to_string(),
            slug: "Acme Compute!".to_string(),
            support: "help@acme.test".to_string(),
            docs: "https://acme.test/docs".to_string(),
            banner: "ACME".to_string(),
        });
        assert_eq!(injector.metadata_dir(), "/etc/acme-compute");
        assert_eq!(injector.profile_marker(), "# >>> acme-compute branding >>>");
        assert!(injector.motd(&ctx()).contains("  ACME\n"));
    }
}
