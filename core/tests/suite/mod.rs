mod socket_authority;
