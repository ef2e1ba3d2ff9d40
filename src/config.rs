use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{Result, SplitError};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Source code parsing configuration
    pub parsing: ParsingConfig,

    /// Layout of generated files
    pub format: FormatConfig,

    /// Unused import removal
    pub pruning: PruningConfig,

    /// Symbol index behind the semantic resolver
    pub resolver: ResolverConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParsingConfig {
    /// Languages to support
    pub languages: Vec<String>,

    /// Maximum file size to parse (in bytes)
    pub max_file_size: usize,

    /// Extension used for new files when the triggering file has none
    pub default_extension: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamespaceStyle {
    /// `namespace A.B { ... }`
    Block,
    /// `namespace A.B;`
    FileScoped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatConfig {
    /// Spaces per indentation level inside a block namespace
    pub indent_width: usize,

    /// Namespace wrapper written around a moved type. Unset: the style of
    /// the file the type comes from.
    pub namespace_style: Option<NamespaceStyle>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PruningConfig {
    /// Whether unused import directives are removed after a split
    pub enabled: bool,

    /// Regular expressions; matching import targets are never removed
    pub keep_imports: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Index the types declared in the workspace
    pub scan_workspace: bool,

    /// Path patterns skipped while scanning the workspace
    pub ignore_patterns: Vec<String>,

    /// Names exported by namespaces the workspace does not declare
    pub known_namespaces: BTreeMap<String, Vec<String>>,
}

impl Default for ParsingConfig {
    fn default() -> Self {
        Self {
            languages: vec!["csharp".to_string()],
            max_file_size: 1024 * 1024, // 1MB
            default_extension: "cs".to_string(),
        }
    }
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            indent_width: 4,
            namespace_style: None,
        }
    }
}

impl Default for PruningConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            keep_imports: vec![],
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            scan_workspace: true,
            ignore_patterns: vec![
                "bin/".to_string(),
                "obj/".to_string(),
                ".git/".to_string(),
            ],
            known_namespaces: default_known_namespaces(),
        }
    }
}

fn default_known_namespaces() -> BTreeMap<String, Vec<String>> {
    let table: &[(&str, &[&str])] = &[
        ("System", &[
            "Action", "Activator", "AggregateException", "ArgumentException", "ArgumentNullException",
            "ArgumentOutOfRangeException", "Array", "ArraySegment", "Attribute", "AttributeUsageAttribute",
            "BitConverter", "Boolean", "Buffer", "Byte", "Char", "Console", "Convert", "DateOnly",
            "DateTime", "DateTimeKind", "DateTimeOffset", "DayOfWeek", "DBNull", "Decimal", "Delegate",
            "Double", "Enum", "Environment", "EventArgs", "EventHandler", "Exception", "FlagsAttribute",
            "FormatException", "Func", "GC", "Guid", "HashCode", "IAsyncDisposable", "ICloneable",
            "IComparable", "IDisposable", "IEquatable", "IFormatProvider", "IFormattable", "Index",
            "IndexOutOfRangeException", "Int16", "Int32", "Int64", "IntPtr", "InvalidCastException",
            "InvalidOperationException", "IObservable", "IObserver", "IProgress", "KeyNotFoundException",
            "Lazy", "Math", "MathF", "Memory", "NotImplementedException", "NotSupportedException",
            "Nullable", "NullReferenceException", "Object", "ObjectDisposedException", "ObsoleteAttribute",
            "OperationCanceledException", "OutOfMemoryException", "Predicate", "Progress", "Random",
            "Range", "ReadOnlyMemory", "ReadOnlySpan", "SerializableAttribute", "Single", "Span",
            "String", "StringComparer", "StringComparison", "StringSplitOptions", "TimeOnly",
            "TimeoutException", "TimeSpan", "TimeZoneInfo", "Tuple", "Type", "UInt16", "UInt32",
            "UInt64", "UnauthorizedAccessException", "Uri", "UriKind", "ValueTuple", "Version",
        ]),
        ("System.Collections", &[
            "ArrayList", "BitArray", "Hashtable", "ICollection", "IComparer", "IDictionary",
            "IEnumerable", "IEnumerator", "IEqualityComparer", "IList", "Queue", "SortedList", "Stack",
        ]),
        ("System.Collections.Concurrent", &[
            "BlockingCollection", "ConcurrentBag", "ConcurrentDictionary", "ConcurrentQueue",
            "ConcurrentStack",
        ]),
        ("System.Collections.Generic", &[
            "Comparer", "Dictionary", "EqualityComparer", "HashSet", "IAsyncEnumerable",
            "IAsyncEnumerator", "ICollection", "IComparer", "IDictionary", "IEnumerable", "IEnumerator",
            "IEqualityComparer", "IList", "IReadOnlyCollection", "IReadOnlyDictionary", "IReadOnlyList",
            "IReadOnlySet", "ISet", "KeyNotFoundException", "KeyValuePair", "LinkedList", "LinkedListNode",
            "List", "PriorityQueue", "Queue", "SortedDictionary", "SortedList", "SortedSet", "Stack",
        ]),
        ("System.Collections.Immutable", &[
            "ImmutableArray", "ImmutableDictionary", "ImmutableHashSet", "ImmutableList",
            "ImmutableQueue", "ImmutableSortedDictionary", "ImmutableSortedSet", "ImmutableStack",
        ]),
        ("System.ComponentModel", &[
            "BrowsableAttribute", "CategoryAttribute", "DefaultValueAttribute", "DescriptionAttribute",
            "DisplayNameAttribute", "EditorBrowsableAttribute", "EditorBrowsableState",
            "INotifyPropertyChanged", "PropertyChangedEventArgs", "PropertyChangedEventHandler",
        ]),
        ("System.Diagnostics", &[
            "ConditionalAttribute", "Debug", "DebuggerDisplayAttribute", "DebuggerStepThroughAttribute",
            "Process", "ProcessStartInfo", "Stopwatch", "Trace",
        ]),
        ("System.Globalization", &["CultureInfo", "NumberStyles", "DateTimeStyles"]),
        ("System.IO", &[
            "BinaryReader", "BinaryWriter", "Directory", "DirectoryInfo", "File", "FileAccess",
            "FileInfo", "FileMode", "FileNotFoundException", "FileShare", "FileStream", "IOException",
            "MemoryStream", "Path", "SearchOption", "Stream", "StreamReader", "StreamWriter",
            "StringReader", "StringWriter", "TextReader", "TextWriter",
        ]),
        ("System.Linq", &[
            "Aggregate", "All", "Any", "Append", "AsEnumerable", "Average", "Cast", "Chunk", "Concat",
            "Contains", "Count", "DefaultIfEmpty", "Distinct", "DistinctBy", "ElementAt", "Enumerable",
            "Except", "First", "FirstOrDefault", "GroupBy", "GroupJoin", "IGrouping", "ILookup",
            "IOrderedEnumerable", "IQueryable", "Intersect", "Join", "Last", "LastOrDefault",
            "LongCount", "Max", "MaxBy", "Min", "MinBy", "OfType", "OrderBy", "OrderByDescending",
            "Prepend", "Queryable", "Reverse", "Select", "SelectMany", "SequenceEqual", "Single",
            "SingleOrDefault", "Skip", "SkipWhile", "Sum", "Take", "TakeWhile", "ThenBy",
            "ThenByDescending", "ToArray", "ToDictionary", "ToHashSet", "ToList", "ToLookup", "Union",
            "Where", "Zip",
        ]),
        ("System.Net.Http", &["HttpClient", "HttpContent", "HttpMethod", "HttpRequestMessage", "HttpResponseMessage", "StringContent"]),
        ("System.Runtime.CompilerServices", &["CallerMemberNameAttribute", "InternalsVisibleToAttribute", "MethodImplAttribute", "MethodImplOptions"]),
        ("System.Runtime.Serialization", &["DataContractAttribute", "DataMemberAttribute", "ISerializable", "SerializationInfo", "StreamingContext"]),
        ("System.Text", &["Encoding", "StringBuilder", "Rune"]),
        ("System.Text.Json", &["JsonDocument", "JsonElement", "JsonException", "JsonSerializer", "JsonSerializerOptions"]),
        ("System.Text.Json.Serialization", &["JsonConverter", "JsonIgnoreAttribute", "JsonPropertyNameAttribute", "JsonStringEnumConverter"]),
        ("System.Text.RegularExpressions", &["Capture", "Group", "Match", "MatchCollection", "Regex", "RegexOptions"]),
        ("System.Threading", &[
            "CancellationToken", "CancellationTokenSource", "Interlocked", "Monitor", "Mutex",
            "ReaderWriterLockSlim", "SemaphoreSlim", "Thread", "ThreadLocal", "Timeout", "Timer",
            "Volatile",
        ]),
        ("System.Threading.Tasks", &["Parallel", "ParallelOptions", "Task", "TaskCompletionSource", "TaskScheduler", "ValueTask"]),
        ("System.Xml", &["XmlDocument", "XmlElement", "XmlNode", "XmlReader", "XmlWriter"]),
        ("System.Xml.Linq", &["XAttribute", "XDocument", "XElement", "XName", "XNamespace"]),
    ];

    table.iter()
        .map(|(namespace, names)| {
            (namespace.to_string(), names.iter().map(|name| name.to_string()).collect())
        })
        .collect()
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| SplitError::Config(e.to_string()))?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| SplitError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration with fallback to default
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(p) => {
                if p.as_ref().exists() {
                    Self::load(p)
                } else {
                    Ok(Self::default())
                }
            }
            None => {
                // Try common config file locations
                let candidates = [
                    "Typesplit.toml",
                    "typesplit.toml",
                    ".typesplit.toml",
                ];

                for candidate in &candidates {
                    if Path::new(candidate).exists() {
                        return Self::load(candidate);
                    }
                }

                Ok(Self::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
[format]
namespace_style = "file_scoped"

[pruning]
keep_imports = ["^System$"]

[resolver.known_namespaces]
"Acme.Core" = ["Widget"]
"#,
        )
        .unwrap();

        assert_eq!(config.format.namespace_style, Some(NamespaceStyle::FileScoped));
        assert_eq!(config.format.indent_width, 4);
        assert!(config.pruning.enabled);
        assert_eq!(config.pruning.keep_imports, vec!["^System$".to_string()]);
        assert_eq!(config.resolver.known_namespaces["Acme.Core"], vec!["Widget".to_string()]);
        assert_eq!(config.parsing.default_extension, "cs");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("typesplit.toml");

        let mut config = Config::default();
        config.format.indent_width = 2;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.format.indent_width, 2);
        assert_eq!(loaded.format.namespace_style, None);
        assert!(loaded.resolver.known_namespaces.contains_key("System.Linq"));
    }

    #[test]
    fn test_missing_explicit_path_falls_back() {
        let config = Config::load_or_default(Some("does-not-exist.toml")).unwrap();
        assert_eq!(config.parsing.languages, vec!["csharp".to_string()]);
    }
}
