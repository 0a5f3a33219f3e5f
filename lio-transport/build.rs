fn main() {
  cfg_aliases::cfg_aliases! {
      linux: { any(target_os = "linux", target_os = "android") },
      apple: { target_vendor = "apple" },
      bsd: {
        any(
          target_os = "freebsd",
          target_os = "dragonfly",
          target_os = "openbsd",
          target_os = "netbsd"
        )
      },

      // Apple's poll(2) has historically misbehaved on sockets; use select there.
      has_poll: { all(unix, not(apple)) },
      has_fcntl: { any(linux, apple, bsd) },
      has_getaddrinfo: { any(linux, apple, bsd, target_os = "illumos", target_os = "solaris") },
      has_msg_nosignal: { any(linux, bsd) },
      has_sock_cloexec: { any(linux, bsd, target_os = "illumos", target_os = "solaris") },
      has_so_nosigpipe: {
        any(apple, target_os = "freebsd", target_os = "netbsd", target_os = "dragonfly")
      },
  }
}
