// SPDX-License-Identifier: Apache-2.0

// Make the osal.conf (or $DOTCONFIG) settings visible to the crate, both as cfg flags and as the
// `kconfig` module.

fn main() {
    osal_build::export_bool_kconfig();
    osal_build::build_kconfig_mod();
}
