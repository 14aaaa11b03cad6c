//! Built-in rule table used when the config file does not define `[[mirrors]]`.

use super::rule::MirrorRule;

const BMCLAPI: &str = "https://bmclapi2.bangbang93.com";
const BMCLAPI_MAVEN: &str = "https://bmclapi2.bangbang93.com/maven";
const TENCENT_MAVEN: &str = "https://mirrors.cloud.tencent.com/nexus/repository/maven-public";

/// Ordered default rules. More specific prefixes come before shorter ones
/// sharing the same host, since the first match wins.
pub fn default_rules() -> Vec<MirrorRule> {
    let bmcl = |prefix: &str, base: String| MirrorRule::new("bmclapi", prefix, base);
    vec![
        bmcl("https://launchermeta.mojang.com", BMCLAPI.to_string()),
        bmcl("https://piston-meta.mojang.com", BMCLAPI.to_string()),
        bmcl("https://piston-data.mojang.com", BMCLAPI.to_string()),
        bmcl("https://launcher.mojang.com", BMCLAPI.to_string()),
        bmcl("https://libraries.minecraft.net", format!("{BMCLAPI}/libraries")),
        bmcl("https://resources.download.minecraft.net", format!("{BMCLAPI}/assets")).bulk(),
        bmcl("http://files.minecraftforge.net/maven", BMCLAPI_MAVEN.to_string()),
        bmcl("https://files.minecraftforge.net/maven", BMCLAPI_MAVEN.to_string()),
        bmcl("https://maven.minecraftforge.net", BMCLAPI_MAVEN.to_string()),
        bmcl(
            "https://maven.neoforged.net/releases/net/neoforged/forge",
            format!("{BMCLAPI_MAVEN}/net/neoforged/forge"),
        ),
        bmcl(
            "https://maven.neoforged.net/releases/net/neoforged/neoforge",
            format!("{BMCLAPI_MAVEN}/net/neoforged/neoforge"),
        ),
        bmcl(
            "http://dl.liteloader.com/versions/versions.json",
            format!("{BMCLAPI_MAVEN}/com/mumfrey/liteloader/versions.json"),
        ),
        bmcl("http://dl.liteloader.com/versions", BMCLAPI_MAVEN.to_string()),
        bmcl("https://meta.fabricmc.net", format!("{BMCLAPI}/fabric-meta")),
        bmcl("https://maven.fabricmc.net", BMCLAPI_MAVEN.to_string()),
        bmcl(
            "https://authlib-injector.yushi.moe",
            format!("{BMCLAPI}/mirrors/authlib-injector"),
        ),
        MirrorRule::new("tencent", "https://repo1.maven.org/maven2", TENCENT_MAVEN),
        MirrorRule::new("tencent", "https://repo.maven.apache.org/maven2", TENCENT_MAVEN),
    ]
}
