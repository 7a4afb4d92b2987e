// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::env;

/// Overrides the machine name, for hosts whose NDI runtime announces a different name
/// than the OS reports.
const HOSTNAME_VAR: &str = "NDIMEDIA_HOSTNAME";

/// The machine name sources on this host are announced under. `ndi://localhost (X)`
/// opens `<machine name> (X)`.
///
/// If neither the override nor the OS yields a name, `localhost` is returned and the
/// source name is left as written.
pub fn resolve_hostname() -> String {
    env::var(HOSTNAME_VAR)
        .ok()
        .filter(|name| !name.is_empty())
        .or_else(|| hostname::get().ok()?.into_string().ok())
        .unwrap_or_else(|| "localhost".to_string())
}

#[cfg(test)]
mod test {
    use std::env;

    use serial_test::serial;

    use crate::{ndi::Source, url};

    use super::{resolve_hostname, HOSTNAME_VAR};

    /// Sets the override for the life of the guard.
    struct Override(Option<String>);

    impl Override {
        fn set(value: &str) -> Override {
            let previous = env::var(HOSTNAME_VAR).ok();
            env::set_var(HOSTNAME_VAR, value);
            Override(previous)
        }
    }

    impl Drop for Override {
        fn drop(&mut self) {
            match self.0.take() {
                Some(previous) => env::set_var(HOSTNAME_VAR, previous),
                None => env::remove_var(HOSTNAME_VAR),
            }
        }
    }

    #[test]
    #[serial]
    fn test_localhost_sources_use_override() {
        let _override = Override::set("RENDER-NODE-3");
        assert_eq!("RENDER-NODE-3", resolve_hostname());
        assert_eq!(
            Ok(Source::from_name("RENDER-NODE-3 (Program)")),
            url::parse("ndi://localhost (Program)")
        );

        // Endpoints are never rewritten.
        assert_eq!(
            Ok(Source::from_address("127.0.0.1:5961")),
            url::parse("ndi://127.0.0.1:5961")
        );
    }

    #[test]
    #[serial]
    fn test_empty_override_uses_machine_name() {
        let _override = Override::set("");
        let name = resolve_hostname();
        assert!(!name.is_empty());
        assert_eq!(
            Ok(Source::from_name(&format!("{} (Program)", name))),
            url::parse("ndi://localhost (Program)")
        );
    }
}
